use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod evaluator;
pub mod handlers;
pub mod providers;

pub fn router() -> Router<AppState> {
    handlers::ai_routes()
}
