use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use skiff_types::{Did, SkiffError};

use crate::encoding::normalize_base64;

/// Leading tag bytes of an encoded private key. Base64 of a tagged key
/// always starts with "Mg", which is the cheap pre-decode check.
const KEY_TAG: [u8; 2] = [0x32, 0x01];

/// The transport-string prefix implied by [`KEY_TAG`].
const KEY_PREFIX: &str = "Mg";

/// An agent's Ed25519 signing identity.
///
/// Parsed from the base64 transport form (`Mg...`) or generated fresh.
/// The secret never leaves process memory except through [`AgentKey::to_encoded`].
#[derive(Clone, Debug)]
pub struct AgentKey {
    signing_key: SigningKey,
}

impl AgentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Parse the base64 transport form, tolerating whitespace and stray
    /// characters around the payload.
    pub fn from_encoded(raw: &str) -> Result<Self, SkiffError> {
        let cleaned = normalize_base64(raw);
        if !cleaned.starts_with(KEY_PREFIX) {
            return Err(SkiffError::InvalidKey);
        }
        let bytes = STANDARD_NO_PAD
            .decode(cleaned.trim_end_matches('='))
            .map_err(|_| SkiffError::InvalidKey)?;
        if bytes.len() != 34 || bytes[..2] != KEY_TAG {
            return Err(SkiffError::InvalidKey);
        }
        let seed: [u8; 32] = bytes[2..]
            .try_into()
            .map_err(|_| SkiffError::InvalidKey)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// The base64 transport form: tag bytes followed by the 32-byte seed.
    pub fn to_encoded(&self) -> String {
        let mut bytes = Vec::with_capacity(34);
        bytes.extend_from_slice(&KEY_TAG);
        bytes.extend_from_slice(self.signing_key.as_bytes());
        STANDARD_NO_PAD.encode(bytes)
    }

    /// Ed25519 public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The Ed25519 verifying (public) key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Derive the agent DID from the public key.
    pub fn did(&self) -> Did {
        Did::from_public_key(&self.public_key_bytes())
    }

    /// Sign arbitrary bytes.
    pub fn sign(&self, message: &[u8]) -> ed25519_dalek::Signature {
        self.signing_key.sign(message)
    }

    /// Verify a signature against this key's public half.
    pub fn verify(&self, message: &[u8], signature: &ed25519_dalek::Signature) -> bool {
        self.verifying_key().verify(message, signature).is_ok()
    }
}
