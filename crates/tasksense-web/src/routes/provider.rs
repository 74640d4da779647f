//! Provider information.

use axum::{extract::State, Json};
use tasksense_core::provider::{provider_info, ProviderInfo};

use crate::state::AppState;

pub async fn get_provider(State(state): State<AppState>) -> Json<ProviderInfo> {
    Json(provider_info(&state.config))
}
