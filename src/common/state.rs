use crate::common::auth::JwtKeys;
use crate::config::Config;
use crate::external::storage::AttachmentStore;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub jwt: Arc<JwtKeys>,
    pub attachments: AttachmentStore,
}

impl AppState {
    pub fn new(db: &DatabaseConnection, config: &Config) -> Self {
        Self {
            db: db.clone(),
            config: config.clone(),
            jwt: Arc::new(JwtKeys::new(
                &config.jwt_secret,
                config.access_token_lifetime,
                config.refresh_token_lifetime,
            )),
            attachments: AttachmentStore::new(&config.media_root, config.media_url.clone()),
        }
    }
}
