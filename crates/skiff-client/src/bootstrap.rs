use skiff_identity::{AgentKey, DelegationProof};
use skiff_store::SessionStore;
use skiff_types::{
    DelegationConfig, LoginMethod, Session, SkiffError, REQUIRED_CAPABILITIES,
};
use tracing::{info, warn};

use crate::client::AgentClient;
use crate::config::ClientConfig;

/// Build an authenticated client from a raw key and a raw proof, select a
/// space, and persist the resulting session.
///
/// Single-attempt and fail-fast: any invalid input or missing capability
/// aborts before the client touches space state, so a capability failure can
/// never leave a partially activated client behind.
pub fn bootstrap(
    config: &DelegationConfig,
    client_config: ClientConfig,
    sessions: &SessionStore,
) -> Result<AgentClient, SkiffError> {
    // Normalization and structural rejects happen inside the parsers.
    let key = AgentKey::from_encoded(&config.signing_key)?;
    let proof = DelegationProof::parse(&config.proof_token)?;

    // Capability check comes before any import or activation.
    let missing = proof.missing_capabilities(&REQUIRED_CAPABILITIES);
    if !missing.is_empty() {
        return Err(SkiffError::MissingCapability(missing.join(", ")));
    }

    // Credentials stay in memory; the raw key is never persisted.
    let client = AgentClient::new(key, client_config);
    client.add_proof(proof)?;

    let spaces = client.spaces();
    let chosen = match &config.requested_space {
        Some(requested) => match spaces.iter().find(|s| s.did.as_str() == requested.as_str()) {
            Some(space) => space.did.clone(),
            None => {
                warn!(%requested, "requested space not found, falling back to first");
                spaces
                    .first()
                    .ok_or(SkiffError::NoSpaceAvailable)?
                    .did
                    .clone()
            }
        },
        None => spaces
            .first()
            .ok_or(SkiffError::NoSpaceAvailable)?
            .did
            .clone(),
    };

    client.set_current_space(&chosen)?;
    info!(agent = %client.agent_did(), space = %chosen, "delegation bootstrap complete");

    sessions.save(&Session::delegated(&client.agent_did(), &chosen))?;
    Ok(client)
}

/// Environment variable carrying the base64 private key.
pub const ENV_PRIVATE_KEY: &str = "STORACHA_PRIVATE_KEY";
/// Environment variable carrying the base64 proof.
pub const ENV_PROOF: &str = "STORACHA_PROOF";
/// Environment variable naming the preferred space DID. Optional.
pub const ENV_SPACE_DID: &str = "STORACHA_SPACE_DID";

/// Credentials supplied out-of-band through the environment, the way the
/// backend deployment provides them.
pub fn config_from_env() -> Result<DelegationConfig, SkiffError> {
    let signing_key = std::env::var(ENV_PRIVATE_KEY).map_err(|_| SkiffError::InvalidKey)?;
    let proof_token = std::env::var(ENV_PROOF)
        .map_err(|_| SkiffError::InvalidProof("proof too short or missing".into()))?;
    let requested_space = std::env::var(ENV_SPACE_DID).ok();
    Ok(DelegationConfig {
        signing_key,
        proof_token,
        requested_space,
    })
}

/// An email login flow the client can re-run silently at startup.
///
/// The flow itself belongs to the service; this seam exists so session
/// restore can be exercised without it.
pub trait EmailLogin {
    fn login(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Session, SkiffError>> + Send;
}

/// Startup auto-reconnect.
///
/// A persisted email session is silently re-established through `login`; a
/// failure degrades to the logged-out default rather than surfacing a crash.
/// Delegation sessions are returned as persisted.
pub async fn restore_session(sessions: &SessionStore, login: &impl EmailLogin) -> Session {
    let persisted = sessions.load();
    if persisted.method != LoginMethod::Email || !persisted.is_logged_in {
        return persisted;
    }

    match login.login(&persisted.email).await {
        Ok(fresh) => {
            if let Err(e) = sessions.save(&fresh) {
                warn!(error = %e, "could not persist restored session");
            }
            fresh
        }
        Err(e) => {
            warn!(error = %e, "silent email reconnect failed");
            sessions.clear();
            Session::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_store::MemoryStore;
    use skiff_types::{Capability, Did};
    use std::sync::Arc;

    fn make_sessions() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStore::new()))
    }

    fn credentials(caps: &[&str], space: &str) -> DelegationConfig {
        let key = AgentKey::generate();
        let issuer = AgentKey::generate();
        let proof = DelegationProof::create(
            &issuer,
            key.did(),
            Did::parse(space).unwrap(),
            Some("demo".into()),
            caps.iter().map(|c| Capability::new(c)).collect(),
            0,
        );
        DelegationConfig {
            signing_key: key.to_encoded(),
            proof_token: proof.encode(),
            requested_space: None,
        }
    }

    #[test]
    fn full_bootstrap_selects_space_and_persists_session() {
        let sessions = make_sessions();
        let config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        let client = bootstrap(&config, ClientConfig::default(), &sessions).unwrap();

        assert_eq!(client.current_space().unwrap().did.as_str(), "did:key:aaaa01");
        let session = sessions.load();
        assert!(session.is_logged_in);
        assert_eq!(session.method, LoginMethod::Delegation);
        assert_eq!(session.space_did, "did:key:aaaa01");
        assert_eq!(session.agent_did, client.agent_did().to_string());
    }

    #[test]
    fn missing_capability_fails_before_activation() {
        let sessions = make_sessions();
        let config = credentials(&["space/blob/add", "space/index/add"], "did:key:aaaa01");
        let err = bootstrap(&config, ClientConfig::default(), &sessions).unwrap_err();

        match err {
            SkiffError::MissingCapability(missing) => assert_eq!(missing, "upload/add"),
            other => panic!("expected MissingCapability, got {other:?}"),
        }
        // No partial activation: nothing was persisted.
        assert_eq!(sessions.load(), Session::default());
    }

    #[test]
    fn error_names_every_missing_capability() {
        let sessions = make_sessions();
        let config = credentials(&["space/index/add"], "did:key:aaaa01");
        let err = bootstrap(&config, ClientConfig::default(), &sessions).unwrap_err();
        match err {
            SkiffError::MissingCapability(missing) => {
                assert!(missing.contains("space/blob/add"));
                assert!(missing.contains("upload/add"));
            }
            other => panic!("expected MissingCapability, got {other:?}"),
        }
    }

    #[test]
    fn unknown_requested_space_falls_back_to_first() {
        let sessions = make_sessions();
        let mut config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        config.requested_space = Some("did:key:nosuch01".into());
        let client = bootstrap(&config, ClientConfig::default(), &sessions).unwrap();
        assert_eq!(client.current_space().unwrap().did.as_str(), "did:key:aaaa01");
    }

    #[test]
    fn matching_requested_space_is_honored() {
        let sessions = make_sessions();
        let mut config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        config.requested_space = Some("did:key:aaaa01".into());
        let client = bootstrap(&config, ClientConfig::default(), &sessions).unwrap();
        assert_eq!(client.current_space().unwrap().did.as_str(), "did:key:aaaa01");
    }

    #[test]
    fn garbage_key_is_rejected() {
        let sessions = make_sessions();
        let mut config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        config.signing_key = "definitely-not-a-key".into();
        assert!(matches!(
            bootstrap(&config, ClientConfig::default(), &sessions),
            Err(SkiffError::InvalidKey)
        ));
    }

    #[test]
    fn short_proof_is_rejected() {
        let sessions = make_sessions();
        let mut config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        config.proof_token = "QUJD".into();
        assert!(matches!(
            bootstrap(&config, ClientConfig::default(), &sessions),
            Err(SkiffError::InvalidProof(_))
        ));
    }

    #[test]
    fn env_credentials_feed_bootstrap() {
        let config = credentials(&REQUIRED_CAPABILITIES, "did:key:aaaa01");
        std::env::set_var(ENV_PRIVATE_KEY, &config.signing_key);
        std::env::set_var(ENV_PROOF, &config.proof_token);
        std::env::remove_var(ENV_SPACE_DID);

        let from_env = config_from_env().unwrap();
        assert_eq!(from_env.signing_key, config.signing_key);
        assert_eq!(from_env.requested_space, None);

        let sessions = make_sessions();
        let client = bootstrap(&from_env, ClientConfig::default(), &sessions).unwrap();
        assert_eq!(client.current_space().unwrap().did.as_str(), "did:key:aaaa01");
    }

    struct FixedLogin {
        outcome: Result<Session, ()>,
    }

    impl EmailLogin for FixedLogin {
        async fn login(&self, email: &str) -> Result<Session, SkiffError> {
            match &self.outcome {
                Ok(session) => {
                    let mut fresh = session.clone();
                    fresh.email = email.to_string();
                    Ok(fresh)
                }
                Err(()) => Err(SkiffError::Transport("login service down".into())),
            }
        }
    }

    fn email_session(email: &str) -> Session {
        Session {
            email: email.to_string(),
            is_logged_in: true,
            method: LoginMethod::Email,
            space_did: "did:key:aaaa01".into(),
            agent_did: "did:key:agent01".into(),
        }
    }

    #[tokio::test]
    async fn email_session_reconnects_silently() {
        let sessions = make_sessions();
        sessions.save(&email_session("a@example.com")).unwrap();
        let login = FixedLogin {
            outcome: Ok(email_session("a@example.com")),
        };
        let restored = restore_session(&sessions, &login).await;
        assert!(restored.is_logged_in);
        assert_eq!(restored.email, "a@example.com");
    }

    #[tokio::test]
    async fn failed_reconnect_degrades_to_logged_out() {
        let sessions = make_sessions();
        sessions.save(&email_session("a@example.com")).unwrap();
        let login = FixedLogin { outcome: Err(()) };
        let restored = restore_session(&sessions, &login).await;
        assert_eq!(restored, Session::default());
        assert_eq!(sessions.load(), Session::default());
    }

    #[tokio::test]
    async fn delegation_session_is_not_reauthenticated() {
        let sessions = make_sessions();
        let agent = Did::parse("did:key:agent01").unwrap();
        let space = Did::parse("did:key:aaaa01").unwrap();
        sessions.save(&Session::delegated(&agent, &space)).unwrap();
        let login = FixedLogin { outcome: Err(()) };
        let restored = restore_session(&sessions, &login).await;
        assert!(restored.is_logged_in);
        assert_eq!(restored.method, LoginMethod::Delegation);
    }
}
