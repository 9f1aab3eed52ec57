//! Middleware layer.
//!
//! Middleware is a function from the request's [`Context`] and the next
//! step to a new step:
//!
//! ```text
//! (Arc<Context>, next: BoxedHandler) -> BoxedHandler
//! ```
//!
//! It runs once per request, when the chain is folded. The handler it
//! returns decides what happens around `next.call(req)`: code before the call
//! runs on the way in, code after it on the way out, and never calling it
//! short-circuits everything further in.
//!
//! ```rust
//! use std::sync::Arc;
//! use ctxstack::{handler_fn, BoxedHandler, Context, Handler, Request};
//!
//! fn tag(ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
//!     handler_fn(move |req: Request| {
//!         let ctx = Arc::clone(&ctx);
//!         let next = Arc::clone(&next);
//!         async move {
//!             ctx.put("tagged", true);
//!             next.call(req).await
//!         }
//!     })
//! }
//! ```
//!
//! Middleware that has no use for the context (the usual shape elsewhere in
//! the ecosystem) plugs in through [`adapt`].

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::handler::BoxedHandler;

/// Wraps the next step of a chain.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(Arc<Context>, BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
        self(ctx, next)
    }
}

/// A type-erased middleware, as stored in a [`Chain`](crate::Chain).
///
/// Cloning shares the same middleware. It is itself a [`Middleware`], so it
/// can be appended like any other.
#[derive(Clone)]
pub struct BoxedMiddleware(Arc<dyn Middleware>);

impl BoxedMiddleware {
    pub fn new(mw: impl Middleware) -> Self {
        Self(Arc::new(mw))
    }
}

impl Middleware for BoxedMiddleware {
    fn wrap(&self, ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
        self.0.wrap(ctx, next)
    }
}

impl fmt::Debug for BoxedMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedMiddleware")
    }
}

/// Erases a middleware, for [`Chain::extend`](crate::Chain::extend) and
/// `FromIterator`.
pub fn boxed(mw: impl Middleware) -> BoxedMiddleware {
    BoxedMiddleware::new(mw)
}

/// Lifts context-free middleware, `Fn(BoxedHandler) -> BoxedHandler`, into
/// [`Middleware`]. The context is dropped on the way through.
pub fn adapt<F>(f: F) -> Adapt<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    Adapt(f)
}

/// Middleware returned by [`adapt`].
pub struct Adapt<F>(F);

impl<F> Middleware for Adapt<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, _ctx: Arc<Context>, next: BoxedHandler) -> BoxedHandler {
        (self.0)(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, handler_fn};
    use crate::request::Request;

    fn request() -> Request {
        http::Request::new(bytes::Bytes::new()).into()
    }

    fn wobble(next: BoxedHandler) -> BoxedHandler {
        handler_fn(move |req| {
            let next = Arc::clone(&next);
            async move {
                let res = next.call(req).await;
                format!("wobble>{}", res.text_body())
            }
        })
    }

    #[tokio::test]
    async fn adapted_middleware_ignores_context() {
        let ctx = Arc::new(Context::new());
        let inner = handler_fn(|_req: Request| async { "inner" });

        let h = adapt(wobble).wrap(ctx, inner);
        assert_eq!(h.call(request()).await.text_body(), "wobble>inner");
    }

    #[tokio::test]
    async fn closures_are_middleware() {
        let mw = boxed(|ctx: Arc<Context>, next: BoxedHandler| -> BoxedHandler {
            ctx.put("wrapped", true);
            next
        });

        let ctx = Arc::new(Context::new());
        let inner = handler_fn(|_req: Request| async { "inner" });
        let h = mw.wrap(Arc::clone(&ctx), inner);

        assert!(ctx.exists("wrapped"));
        assert_eq!(h.call(request()).await.text_body(), "inner");
    }
}
