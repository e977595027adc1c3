// API module - HTTP endpoints

pub mod attendance;
pub mod cards;
pub mod health;
pub mod iot;
pub mod members;
pub mod state;

use axum::Router;

pub use state::AppState;

/// All JSON routes, with state applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(iot::router())
        .merge(attendance::router())
        .merge(cards::router())
        .merge(members::router())
        .merge(health::router())
        .with_state(state)
}
