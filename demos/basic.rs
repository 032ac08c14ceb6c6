//! Minimal strand example — CRUD-style JSON endpoints, a wildcard file route,
//! a WebSocket upgrade route, and health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/files/css/site.css
//!   curl http://localhost:3000/healthz

use http::StatusCode;
use hyper::upgrade::OnUpgrade;
use strand::{
    health, not_found, parse_url, Chain, Response, Router, Server, Step, Store, UpgradeRouter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let router = Router::new()
        .get("/users/:id",    get_user)
        .post("/users",       create_user)
        .delete("/users/:id", delete_user)
        .get("/files/*",      get_file)
        .get("/healthz",      health::liveness)
        .get("/readyz",       health::readiness);

    let upgrades = UpgradeRouter::new().on("/ws/:room", join_room);

    // Registration order is execution order: the URL must be parsed before
    // either router consults it; not_found catches whatever fell through.
    let app = Chain::new()
        .link(parse_url)
        .link(upgrades.into_responder())
        .link(router.into_responder())
        .link(not_found);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/:id
async fn get_user(store: Store) -> Step {
    let id = store.param("id").unwrap_or("unknown").to_owned();
    store.send(Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#)))
}

// POST /users
async fn create_user(mut store: Store) -> Step {
    let body = match store.read_body().await {
        Ok(body) => body,
        Err(e) => return store.fail(e),
    };
    if body.is_empty() {
        return store.send(StatusCode::BAD_REQUEST);
    }

    // Real app: let input: CreateUser = serde_json::from_slice(&body)?;
    store.send(
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(r#"{"id":"99","name":"new_user"}"#),
    )
}

// DELETE /users/:id → 204 No Content
async fn delete_user(store: Store) -> Step {
    store.send(StatusCode::NO_CONTENT)
}

// GET /files/* — echoes the captured remainder; a real app would serve bytes.
async fn get_file(store: Store) -> Step {
    let path = store.wildcard().unwrap_or("").to_owned();
    store.send(Response::text(format!("would serve: {path}")))
}

// GET /ws/:room — the routing layer's job ends at handing over the upgrade
// handle; the WebSocket handshake and frame codec belong to the handler.
async fn join_room(store: Store, upgrade: OnUpgrade) -> Step {
    let room = store.param("room").unwrap_or("lobby").to_owned();
    tokio::spawn(async move {
        match upgrade.await {
            Ok(_io) => tracing::info!(room, "connection upgraded"),
            Err(e) => tracing::warn!(room, "upgrade failed: {e}"),
        }
    });
    store.send(
        Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .no_body(),
    )
}
