use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::{
    adapters::outbound::{postgres::PostgresUserDirectory, storage::LocalStorageProvider},
    config::Settings,
    domain::{ports::inbound::AvatarService, services::AvatarServiceImpl},
};

/// Shared per-request state. Concrete adapters are composed here and
/// only here; everything downstream sees the `AvatarService` port.
#[derive(Clone)]
pub struct AppState {
    pub app_url: Url,
    pub avatar_service: Arc<dyn AvatarService>,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: &Settings) -> Self {
        let directory = Arc::new(PostgresUserDirectory::new(db_pool));
        let storage = Arc::new(LocalStorageProvider::new(config.storage.root.clone()));
        let avatar_service = Arc::new(AvatarServiceImpl::new(directory, storage));

        let app_url = Url::parse(&config.application.app_url).expect("Invalid app URL");

        Self {
            app_url,
            avatar_service,
        }
    }
}
