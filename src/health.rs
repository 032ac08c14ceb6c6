//! Built-in Kubernetes health-check responders.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router:
//!
//! ```rust,no_run
//! use strand::{health, Router};
//!
//! let router = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```
//!
//! Replace `readiness` with your own responder if traffic must be gated on
//! dependency health (database connections, downstream services, warm-up).

use crate::chain::Step;
use crate::response::Response;
use crate::store::Store;

/// Kubernetes liveness probe responder.
///
/// Always terminal `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this responder intentionally has no
/// dependencies.
pub async fn liveness(store: Store) -> Step {
    store.send(Response::text("ok"))
}

/// Kubernetes readiness probe responder (default implementation).
///
/// Terminal `200 OK` with body `"ready"`.
pub async fn readiness(store: Store) -> Step {
    store.send(Response::text("ready"))
}
