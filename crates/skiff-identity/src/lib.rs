mod agent_key;
mod encoding;
mod proof;

pub use agent_key::AgentKey;
pub use encoding::{normalize_base64, pad_base64};
pub use proof::{DelegationProof, MIN_PROOF_LEN};
