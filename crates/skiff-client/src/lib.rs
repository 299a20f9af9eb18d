pub mod api;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod upload;

pub use api::{DelegationApi, DelegationResponse, HealthResponse};
pub use bootstrap::{bootstrap, config_from_env, restore_session, EmailLogin};
pub use client::{AgentClient, RemoteUpload, SpaceHandle};
pub use config::{ApiConfig, ClientConfig};
pub use upload::UploadSupervisor;
