use skiff_types::{Session, SkiffError};
use std::sync::Arc;
use tracing::debug;

use crate::state::StateStore;

/// Storage key for the persisted session.
pub const SESSION_KEY: &str = "storacha_session";

/// Typed facade over the persisted [`Session`].
///
/// This is the injected side-effect boundary: components receive a
/// `SessionStore` instead of touching ambient global state.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn StateStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// The last-persisted session, or the logged-out default when nothing is
    /// stored or the stored value fails to parse. Never an error.
    pub fn load(&self) -> Session {
        let Some(raw) = self.store.read(SESSION_KEY) else {
            return Session::default();
        };
        match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "malformed persisted session treated as absent");
                Session::default()
            }
        }
    }

    /// Overwrite the persisted session.
    pub fn save(&self, session: &Session) -> Result<(), SkiffError> {
        let json =
            serde_json::to_string(session).map_err(|e| SkiffError::Serialization(e.to_string()))?;
        self.store.write(SESSION_KEY, &json)
    }

    /// Remove the persisted session.
    pub fn clear(&self) {
        self.store.remove(SESSION_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use skiff_types::{Did, LoginMethod};

    fn make_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn load_without_save_is_default() {
        let store = make_store();
        assert_eq!(store.load(), Session::default());
    }

    #[test]
    fn save_then_load() {
        let store = make_store();
        let agent = Did::from_public_key(&[3u8; 32]);
        let space = Did::parse("did:key:beef01").unwrap();
        let session = Session::delegated(&agent, &space);
        store.save(&session).unwrap();
        assert_eq!(store.load(), session);
    }

    #[test]
    fn clear_removes_session() {
        let store = make_store();
        let agent = Did::from_public_key(&[3u8; 32]);
        let space = Did::parse("did:key:beef01").unwrap();
        store.save(&Session::delegated(&agent, &space)).unwrap();
        store.clear();
        assert_eq!(store.load(), Session::default());
    }

    #[test]
    fn malformed_json_loads_as_default() {
        let raw = Arc::new(MemoryStore::new());
        raw.write(SESSION_KEY, "{not json").unwrap();
        let store = SessionStore::new(raw);
        let session = store.load();
        assert!(!session.is_logged_in);
        assert_eq!(session.method, LoginMethod::None);
    }

    #[test]
    fn save_replaces_wholesale() {
        let store = make_store();
        let agent = Did::from_public_key(&[1u8; 32]);
        let space_a = Did::parse("did:key:aaaa01").unwrap();
        let space_b = Did::parse("did:key:bbbb01").unwrap();
        store.save(&Session::delegated(&agent, &space_a)).unwrap();
        store.save(&Session::delegated(&agent, &space_b)).unwrap();
        assert_eq!(store.load().space_did, space_b.to_string());
    }
}
