use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A decentralized identifier for agents and storage spaces.
///
/// Agents derive theirs from a public key (`did:key:<hex>`); spaces are
/// opaque strings handed out by the service (`did:key:` or `did:web:`).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Did(String);

impl Did {
    /// Derive an agent DID — `did:key:` plus the SHA-256 of the Ed25519 public key.
    pub fn from_public_key(pubkey_bytes: &[u8; 32]) -> Self {
        let hash = Sha256::digest(pubkey_bytes);
        Self(format!("did:key:{}", hex::encode(hash)))
    }

    /// Parse an existing DID string, rejecting anything without a `did:<method>:` shape.
    pub fn parse(s: &str) -> Result<Self, SkiffError> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(rest)) if !method.is_empty() && !rest.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(SkiffError::Serialization(format!("not a DID: {s}"))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix epoch timestamp in seconds.
pub type Timestamp = i64;

/// A named permission granted by a delegation, e.g. "upload/add".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability(pub String);

impl Capability {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The capability set every usable delegation must carry.
pub const REQUIRED_CAPABILITIES: [&str; 3] = ["space/blob/add", "space/index/add", "upload/add"];

/// Pre-flight expiry margin in seconds: credentials inside this window of
/// their expiry count as already expired.
pub const EXPIRY_BUFFER_SECONDS: i64 = 300;

/// How the current session was established.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    Email,
    Delegation,
    #[default]
    None,
}

/// The persisted login state. Replaced wholesale on login, cleared on logout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub is_logged_in: bool,
    pub method: LoginMethod,
    pub space_did: String,
    pub agent_did: String,
}

impl Session {
    /// A session freshly established through a delegation proof.
    pub fn delegated(agent_did: &Did, space_did: &Did) -> Self {
        Self {
            email: String::new(),
            is_logged_in: true,
            method: LoginMethod::Delegation,
            space_did: space_did.to_string(),
            agent_did: agent_did.to_string(),
        }
    }
}

/// Transient input to the delegation bootstrap. Never persisted.
#[derive(Clone, Debug)]
pub struct DelegationConfig {
    /// Base64 private key string, possibly with whitespace or stray characters.
    pub signing_key: String,
    /// Base64 capability proof, same caveats.
    pub proof_token: String,
    /// Preferred space DID; falls back to the first available when absent or unknown.
    pub requested_space: Option<String>,
}

/// One completed upload, appended to the locally persisted history.
/// Immutable after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedFileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub cid: String,
    pub uploaded_at: Timestamp,
    pub gateway_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Lifecycle of an in-flight upload's progress entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// Live progress for one upload, keyed by a per-call id.
///
/// The percentage is a simulated UI affordance, not a byte-accurate
/// measurement; callers must not treat it as such.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadProgressEntry {
    pub file_id: String,
    pub file_name: String,
    pub progress_percent: u8,
    pub status: UploadStatus,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

/// Common error types.
#[derive(Debug, thiserror::Error)]
pub enum SkiffError {
    #[error("invalid private key format")]
    InvalidKey,
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    #[error("delegation missing required capability: {0}")]
    MissingCapability(String),
    #[error("no space available")]
    NoSpaceAvailable,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid cid: {0}")]
    InvalidCid(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upload cancelled")]
    Cancelled,
}
