use std::sync::Arc;

use adrift_core::{BottleService, CoreError, CoreResult};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: BottleService,
}

/// Run core work off the async runtime. SQLite calls block on the writer
/// mutex, so every handler goes through here.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&BottleService) -> CoreResult<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError(CoreError::Store(anyhow::anyhow!("join error: {e}"))))?
        .map_err(ApiError)
}
