pub mod events;
pub mod promos;
pub mod tickets;
pub mod admin_logs;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(promos::routes())
        .merge(tickets::routes())
        .merge(admin_logs::routes())
}
