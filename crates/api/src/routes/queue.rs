//! Route definitions for the generation queue.
//!
//! All queue routes require authentication; job status and cancellation
//! are additionally scoped to the owning account inside the handlers.

use axum::routing::get;
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

/// Routes mounted at `/queue`.
///
/// ```text
/// POST   /      -> admit
/// GET    /      -> overview
/// GET    /{id}  -> job_status
/// DELETE /{id}  -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(queue::overview).post(queue::admit))
        .route("/{id}", get(queue::job_status).delete(queue::cancel))
}
