use std::sync::Arc;

use crate::database::Database;
use crate::ports::catalog::CatalogApi;

pub struct AppState {
    pub db: Arc<Database>,
    pub catalog: Arc<dyn CatalogApi>,
}
