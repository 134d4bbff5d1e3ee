use std::sync::{Arc, RwLock};

use crate::db::pool::DbPool;
use crate::settings::ServerSettings;

pub struct AppState {
    pub db_pool: DbPool,
    pub settings: Arc<RwLock<ServerSettings>>,
}
