use serde::Deserialize;
use skiff_store::{CachedDelegation, DelegationCache, SpaceInfo};
use skiff_types::{Did, SkiffError, Timestamp};
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Consumer of the backend delegation API.
///
/// The backend is an external collaborator; this client only speaks its
/// documented GET surface. Idempotent GETs are retried with exponential
/// backoff; 400/401/403 responses are terminal on the first attempt.
pub struct DelegationApi {
    config: ApiConfig,
    http: reqwest::Client,
}

/// `GET /api/health` response.
#[derive(Clone, Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storacha: bool,
    pub timestamp: Timestamp,
}

/// A delegation issued by the backend for one agent DID.
#[derive(Clone, Debug, PartialEq)]
pub struct DelegationResponse {
    /// Base64 proof string.
    pub delegation: String,
    /// Unix seconds.
    pub expires_at: Timestamp,
    pub space_did: String,
    pub space_name: String,
}

/// Wire shape of `GET /api/delegation/:did`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationWire {
    success: bool,
    #[serde(default)]
    delegation: String,
    #[serde(default)]
    expires_at: Timestamp,
    #[serde(default)]
    space_did: String,
    #[serde(default)]
    space_name: String,
    #[serde(default)]
    error: Option<String>,
}

impl DelegationApi {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Backend liveness and service wiring.
    pub async fn health(&self) -> Result<HealthResponse, SkiffError> {
        self.get_json("/api/health").await
    }

    /// Request a delegation for an agent DID.
    pub async fn fetch_delegation(&self, agent: &Did) -> Result<DelegationResponse, SkiffError> {
        let wire: DelegationWire = self
            .get_json(&format!("/api/delegation/{agent}"))
            .await?;
        if !wire.success {
            let detail = wire.error.unwrap_or_else(|| "delegation refused".into());
            return Err(SkiffError::Unauthorized(detail));
        }
        if wire.delegation.is_empty() {
            return Err(SkiffError::Serialization(
                "delegation missing from response".into(),
            ));
        }
        Ok(DelegationResponse {
            delegation: wire.delegation,
            expires_at: wire.expires_at,
            space_did: wire.space_did,
            space_name: wire.space_name,
        })
    }

    /// Cached delegation when still valid at `now`, otherwise a fresh fetch
    /// that repopulates the cache.
    pub async fn delegation_for(
        &self,
        agent: &Did,
        cache: &DelegationCache,
        now: Timestamp,
    ) -> Result<DelegationResponse, SkiffError> {
        if let Some((cached, space)) = cache.load_valid(now) {
            debug!(agent = %agent, "using cached delegation");
            return Ok(DelegationResponse {
                delegation: cached.delegation,
                expires_at: cached.expires_at,
                space_did: space.space_did,
                space_name: space.space_name,
            });
        }

        let fresh = self.fetch_delegation(agent).await?;
        cache.save(
            &CachedDelegation {
                delegation: fresh.delegation.clone(),
                expires_at: fresh.expires_at,
            },
            &SpaceInfo {
                space_did: fresh.space_did.clone(),
                space_name: fresh.space_name.clone(),
            },
        )?;
        Ok(fresh)
    }

    /// GET with exponential backoff. Client-fault statuses (400/401/403) are
    /// never retried; transport errors and other statuses are, up to the
    /// configured attempt count.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, SkiffError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut backoff = self.config.initial_backoff;
        let mut last_err = SkiffError::Transport("no attempts made".into());

        for attempt in 1..=self.config.max_attempts {
            match self.http.get(&url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .await
                            .map_err(|e| SkiffError::Serialization(e.to_string()));
                    }
                    let detail = resp.text().await.unwrap_or_default();
                    if matches!(status.as_u16(), 400 | 401 | 403) {
                        return Err(SkiffError::Unauthorized(format!(
                            "backend returned {status}: {detail}"
                        )));
                    }
                    last_err =
                        SkiffError::Transport(format!("backend returned {status}: {detail}"));
                }
                Err(e) => last_err = SkiffError::Transport(e.to_string()),
            }

            if attempt < self.config.max_attempts {
                warn!(%url, attempt, "backend GET failed, backing off");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        Err(last_err)
    }
}
