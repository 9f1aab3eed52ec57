//! # ctxstack
//!
//! Appendable middleware chains with a request-scoped context, for hyper
//! services.
//!
//! ## The model
//!
//! - A [`Context`] is a lock-protected string → value map that lives for one
//!   request. Every middleware and the terminal handler see the same one.
//! - A [`Middleware`] takes that context and the next step and returns a new
//!   step. Order of appending is order of execution on the way in.
//! - A [`Chain`] is an immutable list of middleware plus a base context.
//!   `append` returns a new chain, so a shared prefix can be reused freely.
//! - `then*` attaches the terminal handler and yields a [`ClosedChain`], which
//!   is a [`Handler`]. Only closed chains serve requests, and they cannot be
//!   appended to.
//!
//! Each request copies the closed chain's base context, so nothing a request
//! writes is ever seen by another request or by the chain itself.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ctxstack::{handler_fn, BoxedHandler, Chain, Context, Handler, Key, Request, Server};
//!
//! const USER: Key<String> = Key::new("user");
//!
//! fn auth(ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
//!     handler_fn(move |req: Request| {
//!         let ctx = Arc::clone(&ctx);
//!         let next = Arc::clone(&next);
//!         async move {
//!             let user = req.header("x-user").unwrap_or("anonymous").to_owned();
//!             USER.put(&ctx, user);
//!             next.call(req).await
//!         }
//!     })
//! }
//!
//! async fn hello(ctx: Arc<Context>, _req: Request) -> String {
//!     match USER.get(&ctx) {
//!         Ok(user) => format!("hello, {user}"),
//!         Err(_) => "hello".to_owned(),
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ctxstack::Error> {
//!     let app = Chain::new().append(auth).then_context_fn(hello);
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(app).await
//! }
//! ```

mod chain;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;

pub use chain::{Chain, ClosedChain};
pub use context::{Context, Key, Value};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ContextHandler, Handler, handler_fn};
pub use middleware::{BoxedMiddleware, Middleware};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
