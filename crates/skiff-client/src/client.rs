use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use skiff_identity::{AgentKey, DelegationProof};
use skiff_types::{Did, SkiffError, REQUIRED_CAPABILITIES};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::config::ClientConfig;

/// A storage space known to the client, registered by an imported proof.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceHandle {
    pub did: Did,
    pub name: Option<String>,
}

/// An upload as listed by the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteUpload {
    pub cid: String,
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
struct ClientState {
    proofs: Vec<DelegationProof>,
    spaces: Vec<SpaceHandle>,
    current: Option<Did>,
}

/// The authenticated client: a signing identity plus imported capability
/// grants, bound to one current space.
///
/// Credentials live in memory only; the raw key is never written to disk.
#[derive(Debug)]
pub struct AgentClient {
    key: AgentKey,
    config: ClientConfig,
    http: reqwest::Client,
    state: Arc<RwLock<ClientState>>,
}

impl AgentClient {
    pub fn new(key: AgentKey, config: ClientConfig) -> Self {
        Self {
            key,
            config,
            http: reqwest::Client::new(),
            state: Arc::new(RwLock::new(ClientState::default())),
        }
    }

    /// This client's agent identity.
    pub fn agent_did(&self) -> Did {
        self.key.did()
    }

    /// Gateway host used for record URLs.
    pub fn gateway(&self) -> &str {
        &self.config.gateway
    }

    /// Import a capability grant, registering the space it authorizes.
    /// Importing a second grant for the same space is idempotent.
    pub fn add_proof(&self, proof: DelegationProof) -> Result<(), SkiffError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| SkiffError::Storage("client state lock poisoned".into()))?;
        if !state.spaces.iter().any(|s| s.did == proof.space) {
            state.spaces.push(SpaceHandle {
                did: proof.space.clone(),
                name: proof.space_name.clone(),
            });
        }
        debug!(space = %proof.space, "imported delegation proof");
        state.proofs.push(proof);
        Ok(())
    }

    /// Spaces registered so far, in import order.
    pub fn spaces(&self) -> Vec<SpaceHandle> {
        self.state.read().map(|s| s.spaces.clone()).unwrap_or_default()
    }

    /// Activate a space as current. The space must be registered.
    pub fn set_current_space(&self, did: &Did) -> Result<(), SkiffError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| SkiffError::Storage("client state lock poisoned".into()))?;
        if !state.spaces.iter().any(|s| &s.did == did) {
            return Err(SkiffError::NotFound(format!("space {did}")));
        }
        state.current = Some(did.clone());
        Ok(())
    }

    /// The currently active space, if one has been selected.
    pub fn current_space(&self) -> Option<SpaceHandle> {
        let state = self.state.read().ok()?;
        let current = state.current.as_ref()?;
        state.spaces.iter().find(|s| &s.did == current).cloned()
    }

    /// Upload one file to the current space, returning its CID.
    ///
    /// Permission failures come back as tagged errors: a response naming a
    /// missing capability maps to [`SkiffError::MissingCapability`], never to
    /// a message the caller has to sniff.
    pub async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SkiffError> {
        let space = self
            .current_space()
            .ok_or(SkiffError::NoSpaceAvailable)?;
        let agent = self.agent_did().to_string();
        let body = UploadRequest {
            name,
            mime_type,
            space: space.did.as_str(),
            agent: &agent,
            data: STANDARD_NO_PAD.encode(&bytes),
        };

        let url = format!("{}/upload", self.config.service_url);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SkiffError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            let body: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| SkiffError::Serialization(e.to_string()))?;
            let cid = body["cid"]
                .as_str()
                .ok_or_else(|| SkiffError::Serialization("missing cid in response".into()))?;
            Ok(cid.to_string())
        } else {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            Err(classify_service_error(status.as_u16(), &body))
        }
    }

    /// List uploads recorded by the service for the current space.
    pub async fn list_uploads(&self) -> Result<Vec<RemoteUpload>, SkiffError> {
        let space = self
            .current_space()
            .ok_or(SkiffError::NoSpaceAvailable)?;
        let url = format!(
            "{}/uploads?space={}",
            self.config.service_url,
            space.did.as_str()
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SkiffError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SkiffError::Transport(format!(
                "list failed with status {}",
                resp.status()
            )));
        }
        resp.json::<Vec<RemoteUpload>>()
            .await
            .map_err(|e| SkiffError::Serialization(e.to_string()))
    }
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    name: &'a str,
    mime_type: &'a str,
    space: &'a str,
    agent: &'a str,
    data: String,
}

/// Map a non-success service response to a tagged error.
///
/// Well-behaved services name the missing capability in a structured field;
/// older ones only mention it in the error text, so both are recognized.
fn classify_service_error(status: u16, body: &serde_json::Value) -> SkiffError {
    if let Some(cap) = body["capability"].as_str() {
        return SkiffError::MissingCapability(cap.to_string());
    }
    let detail = body["error"].as_str().unwrap_or("unknown error");
    if let Some(cap) = REQUIRED_CAPABILITIES.iter().find(|c| detail.contains(*c)) {
        return SkiffError::MissingCapability(cap.to_string());
    }
    if detail.contains("permission denied") || detail.contains("capability") {
        return SkiffError::Unauthorized(detail.to_string());
    }
    match status {
        401 | 403 => SkiffError::Unauthorized(detail.to_string()),
        _ => SkiffError::Transport(format!("upload failed with status {status}: {detail}")),
    }
}
