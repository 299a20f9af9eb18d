mod cache;
mod history;
mod session;
mod state;

pub use cache::{CachedDelegation, DelegationCache, SpaceInfo, DELEGATION_KEY, SPACE_INFO_KEY};
pub use history::{UploadHistory, UPLOADS_KEY};
pub use session::{SessionStore, SESSION_KEY};
pub use state::{FileStore, MemoryStore, StateStore};
