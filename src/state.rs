use std::sync::Arc;

use crate::auth::{AuthError, JwtKeys};
use crate::config::AppConfig;
use crate::database::Store;

/// Shared handler state: storage backend, configuration and signing keys
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Result<Self, AuthError> {
        let keys = JwtKeys::from_config(&config.security)?;
        Ok(Self { store, config, keys })
    }
}
