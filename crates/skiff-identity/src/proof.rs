use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use ed25519_dalek::{Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use skiff_types::{Capability, Did, SkiffError, Timestamp};

use crate::agent_key::AgentKey;
use crate::encoding::{normalize_base64, pad_base64};

/// Anything shorter than this after cleaning cannot be a real proof.
pub const MIN_PROOF_LEN: usize = 100;

/// A capability grant: the space owner signs an agent's authority to perform
/// specific operations within the space, without handing over root credentials.
///
/// Transported as base64-encoded JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegationProof {
    /// Who issued this grant (the space owner).
    pub issuer: Did,
    /// The agent this grant authorizes.
    pub audience: Did,
    /// The space the grant applies to.
    pub space: Did,
    /// Human-readable space label, when the issuer supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
    /// What the audience is allowed to do.
    pub capabilities: Vec<Capability>,
    /// When this grant was created.
    pub issued_at: Timestamp,
    /// When this grant expires (0 = never).
    pub expires_at: Timestamp,
    /// Issuer's hex-encoded Ed25519 signature over the canonical content.
    pub signature: String,
}

impl DelegationProof {
    /// Create and sign a grant. Used by credential-generation tooling and tests.
    pub fn create(
        issuer: &AgentKey,
        audience: Did,
        space: Did,
        space_name: Option<String>,
        capabilities: Vec<Capability>,
        expires_at: Timestamp,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        let signable = Self::signable_content(
            &issuer.did(),
            &audience,
            &space,
            &capabilities,
            now,
            expires_at,
        );
        let signature = hex::encode(issuer.sign(signable.as_bytes()).to_bytes());

        Self {
            issuer: issuer.did(),
            audience,
            space,
            space_name,
            capabilities,
            issued_at: now,
            expires_at,
            signature,
        }
    }

    /// Parse the base64 transport form.
    ///
    /// The raw string is normalized (non-alphabet characters stripped, `=`
    /// padding restored) before decoding, since proofs are routinely pasted
    /// with line wraps.
    pub fn parse(raw: &str) -> Result<Self, SkiffError> {
        let cleaned = pad_base64(&normalize_base64(raw));
        if cleaned.len() < MIN_PROOF_LEN {
            return Err(SkiffError::InvalidProof(
                "proof too short or missing".into(),
            ));
        }
        let bytes = STANDARD
            .decode(&cleaned)
            .map_err(|e| SkiffError::InvalidProof(format!("not base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SkiffError::InvalidProof(format!("malformed grant: {e}")))
    }

    /// The base64 transport form.
    pub fn encode(&self) -> String {
        // Serialization of a plain struct cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD_NO_PAD.encode(json)
    }

    /// Verify the issuer's signature and that the grant has not expired.
    pub fn verify(&self, issuer_pubkey: &[u8; 32]) -> Result<(), SkiffError> {
        let now = chrono::Utc::now().timestamp();
        if self.is_expired(now, 0) {
            return Err(SkiffError::Unauthorized("delegation expired".into()));
        }

        let signable = Self::signable_content(
            &self.issuer,
            &self.audience,
            &self.space,
            &self.capabilities,
            self.issued_at,
            self.expires_at,
        );
        let verifying_key = VerifyingKey::from_bytes(issuer_pubkey)
            .map_err(|_| SkiffError::InvalidProof("bad issuer key".into()))?;
        let sig_bytes: [u8; 64] = hex::decode(&self.signature)
            .map_err(|_| SkiffError::InvalidProof("bad signature encoding".into()))?
            .try_into()
            .map_err(|_| SkiffError::InvalidProof("bad signature length".into()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        verifying_key
            .verify(signable.as_bytes(), &signature)
            .map_err(|_| SkiffError::InvalidProof("signature mismatch".into()))
    }

    /// Whether the grant is expired at `now`, with a pre-flight buffer.
    /// `expires_at == 0` means the grant never expires.
    pub fn is_expired(&self, now: Timestamp, buffer: i64) -> bool {
        self.expires_at > 0 && now + buffer >= self.expires_at
    }

    /// Required capabilities this grant does NOT carry, in required-set order.
    pub fn missing_capabilities(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|cap| !self.capabilities.iter().any(|c| c.0 == **cap))
            .map(|cap| cap.to_string())
            .collect()
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c.0 == cap)
    }

    fn signable_content(
        issuer: &Did,
        audience: &Did,
        space: &Did,
        capabilities: &[Capability],
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> String {
        // Serialization of a string list cannot fail.
        let caps_json = serde_json::to_string(capabilities).unwrap_or_default();
        format!("delegation:{issuer}:{audience}:{space}:{caps_json}:{issued_at}:{expires_at}")
    }
}
