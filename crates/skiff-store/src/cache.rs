use serde::{Deserialize, Serialize};
use skiff_types::{SkiffError, Timestamp, EXPIRY_BUFFER_SECONDS};
use std::sync::Arc;
use tracing::debug;

use crate::state::StateStore;

/// Storage key for the cached delegation token.
pub const DELEGATION_KEY: &str = "storacha_delegation";

/// Storage key for the cached space info.
pub const SPACE_INFO_KEY: &str = "storacha_space_info";

/// A delegation token fetched from the backend, cached until near expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedDelegation {
    /// Base64 proof string, exactly as the backend returned it.
    pub delegation: String,
    /// Unix seconds.
    pub expires_at: Timestamp,
}

/// The space the cached delegation is scoped to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub space_did: String,
    pub space_name: String,
}

/// Cache for backend-issued delegations, expiry-aware on load.
#[derive(Clone)]
pub struct DelegationCache {
    store: Arc<dyn StateStore>,
}

impl DelegationCache {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Persist a fetched delegation and its space info.
    pub fn save(
        &self,
        delegation: &CachedDelegation,
        space: &SpaceInfo,
    ) -> Result<(), SkiffError> {
        let token = serde_json::to_string(delegation)
            .map_err(|e| SkiffError::Serialization(e.to_string()))?;
        let info =
            serde_json::to_string(space).map_err(|e| SkiffError::Serialization(e.to_string()))?;
        self.store.write(DELEGATION_KEY, &token)?;
        self.store.write(SPACE_INFO_KEY, &info)
    }

    /// The cached delegation, only when still usable at `now`.
    ///
    /// Absent, malformed, expired, or inside the pre-flight buffer all load
    /// as `None`; the caller refetches from the backend in that case.
    pub fn load_valid(&self, now: Timestamp) -> Option<(CachedDelegation, SpaceInfo)> {
        let delegation: CachedDelegation = self.read_json(DELEGATION_KEY)?;
        if now + EXPIRY_BUFFER_SECONDS >= delegation.expires_at {
            debug!(expires_at = delegation.expires_at, "cached delegation expired");
            return None;
        }
        let space: SpaceInfo = self.read_json(SPACE_INFO_KEY)?;
        Some((delegation, space))
    }

    /// Drop the cache.
    pub fn clear(&self) {
        self.store.remove(DELEGATION_KEY);
        self.store.remove(SPACE_INFO_KEY);
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "malformed cache entry treated as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;

    const NOW: Timestamp = 1_700_000_000;

    fn make_cache() -> DelegationCache {
        DelegationCache::new(Arc::new(MemoryStore::new()))
    }

    fn entry(expires_at: Timestamp) -> (CachedDelegation, SpaceInfo) {
        (
            CachedDelegation {
                delegation: "dGVzdA".repeat(20),
                expires_at,
            },
            SpaceInfo {
                space_did: "did:key:cafe01".into(),
                space_name: "demo".into(),
            },
        )
    }

    #[test]
    fn fresh_delegation_loads() {
        let cache = make_cache();
        let (delegation, space) = entry(NOW + 3600);
        cache.save(&delegation, &space).unwrap();
        let (loaded, loaded_space) = cache.load_valid(NOW).unwrap();
        assert_eq!(loaded, delegation);
        assert_eq!(loaded_space, space);
    }

    #[test]
    fn expired_delegation_is_absent() {
        let cache = make_cache();
        let (delegation, space) = entry(NOW - 1);
        cache.save(&delegation, &space).unwrap();
        assert!(cache.load_valid(NOW).is_none());
    }

    #[test]
    fn delegation_inside_buffer_is_absent() {
        let cache = make_cache();
        let (delegation, space) = entry(NOW + EXPIRY_BUFFER_SECONDS - 1);
        cache.save(&delegation, &space).unwrap();
        assert!(cache.load_valid(NOW).is_none());
    }

    #[test]
    fn delegation_just_past_buffer_loads() {
        let cache = make_cache();
        let (delegation, space) = entry(NOW + EXPIRY_BUFFER_SECONDS + 1);
        cache.save(&delegation, &space).unwrap();
        assert!(cache.load_valid(NOW).is_some());
    }

    #[test]
    fn empty_cache_is_absent() {
        assert!(make_cache().load_valid(NOW).is_none());
    }

    #[test]
    fn malformed_token_is_absent() {
        let raw = Arc::new(MemoryStore::new());
        raw.write(DELEGATION_KEY, "not json").unwrap();
        let cache = DelegationCache::new(raw);
        assert!(cache.load_valid(NOW).is_none());
    }

    #[test]
    fn clear_drops_both_keys() {
        let cache = make_cache();
        let (delegation, space) = entry(NOW + 3600);
        cache.save(&delegation, &space).unwrap();
        cache.clear();
        assert!(cache.load_valid(NOW).is_none());
    }
}
