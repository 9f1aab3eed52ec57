//! Minimal ctxstack example: a timing middleware, a context-free adapted
//! middleware, and a per-request rebased chain.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'x-user: alice' http://localhost:3000/users/7

use std::sync::Arc;
use std::time::Instant;

use ctxstack::middleware::adapt;
use ctxstack::{
    BoxedHandler, Chain, ClosedChain, Context, Handler, Key, Request, Response, Server, handler_fn,
};
use http::header::{HeaderName, HeaderValue};
use tracing::info;

const USER: Key<String> = Key::new("user");
const USER_ID: Key<String> = Key::new("user_id");

#[tokio::main]
async fn main() -> Result<(), ctxstack::Error> {
    tracing_subscriber::fmt::init();

    let users = Chain::new()
        .append(timing)
        .append(adapt(powered_by))
        .append(identify)
        .then_context_fn(get_user);

    // Stands in for a router: resolves the path parameter, then serves the
    // request with a copy of the chain whose base context already holds it.
    let app = handler_fn(move |req: Request| {
        let users = users.clone();
        async move {
            let id = req
                .path()
                .strip_prefix("/users/")
                .filter(|id| !id.is_empty())
                .map(str::to_owned);
            match id {
                Some(id) => {
                    let chain: ClosedChain = users.inject(USER_ID.name(), id);
                    chain.call(req).await
                }
                None => Response::status(http::StatusCode::NOT_FOUND),
            }
        }
    });

    Server::bind(([0, 0, 0, 0], 3000)).serve(app).await
}

fn timing(_ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let started = Instant::now();
            let path = req.path().to_owned();
            let res = next.call(req).await;
            info!(%path, status = %res.status_code(), elapsed = ?started.elapsed(), "handled");
            res
        }
    })
}

fn powered_by(next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let mut res = next.call(req).await;
            res.headers_mut().insert(
                HeaderName::from_static("x-powered-by"),
                HeaderValue::from_static("ctxstack"),
            );
            res
        }
    })
}

fn identify(ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
    handler_fn(move |req: Request| {
        let ctx = Arc::clone(&ctx);
        let next = Arc::clone(&next);
        async move {
            let user = req.header("x-user").unwrap_or("anonymous").to_owned();
            USER.put(&ctx, user);
            next.call(req).await
        }
    })
}

// GET /users/:id
async fn get_user(ctx: Arc<Context>, _req: Request) -> String {
    let id = USER_ID.get(&ctx).map(|v| (*v).clone()).unwrap_or_default();
    let viewer = USER.get(&ctx).map(|v| (*v).clone()).unwrap_or_default();
    format!(r#"{{"id":"{id}","viewer":"{viewer}"}}"#)
}
