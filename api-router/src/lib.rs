use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    controlplane::{create_corpus, create_namespace, delete_corpus},
    dataplane::{memorize, recall},
    liveness::live,
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod routes;

/// Control-plane (`/cp`) and data-plane (`/dp`) routes plus probes.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let controlplane = Router::new()
        .route("/cp/namespace", post(create_namespace))
        .route("/cp/corpus", post(create_corpus).delete(delete_corpus));

    let dataplane = Router::new()
        .route("/dp/memorize", post(memorize))
        .route("/dp/recall", post(recall));

    probes.merge(controlplane).merge(dataplane)
}
