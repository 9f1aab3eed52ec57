//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A chain has to hold handlers and middleware of *different* concrete types
//! and hand them to each other as "the next step". Rust collections and
//! function signatures can only name one type, so everything that can serve
//! one request is erased behind `Arc<dyn Handler>`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ handler_fn(hello)
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn Handler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Middleware receives the next step as a `BoxedHandler` and returns a new
//! one, so wrapping costs one `Arc` per layer per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A type-erased handler shared between the layers of one request and across
/// concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

// ── Handler ───────────────────────────────────────────────────────────────────

/// Something that can handle one request/response exchange.
///
/// Every layer of a chain is one of these: the terminal handler, each
/// middleware's wrapper around its `next`, and the
/// [`ClosedChain`](crate::ClosedChain) itself. Failures are expressed as
/// responses; a panic inside `call` is not caught.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;

    fn into_boxed_handler(self) -> BoxedHandler
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl<T: Handler + ?Sized> Handler for Arc<T> {
    fn call(&self, req: Request) -> BoxFuture {
        (**self).call(req)
    }
}

/// Lifts a plain async function into a [`BoxedHandler`].
///
/// ```rust
/// use ctxstack::{handler_fn, Request, Response};
///
/// let hello = handler_fn(|_req: Request| async { Response::text("hello") });
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> BoxedHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Newtype that bridges a concrete function to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Terminal handlers ─────────────────────────────────────────────────────────

/// Produces a chain's terminal handler for one request's [`Context`].
///
/// Called once per request, after the context has been copied from the
/// chain's base and before any middleware wraps the result.
pub trait ContextHandler: Send + Sync + 'static {
    fn build(&self, ctx: Arc<Context>) -> BoxedHandler;
}

impl<F> ContextHandler for F
where
    F: Fn(Arc<Context>) -> BoxedHandler + Send + Sync + 'static,
{
    fn build(&self, ctx: Arc<Context>) -> BoxedHandler {
        self(ctx)
    }
}

/// Terminal handler that ignores the context.
pub(crate) struct Fixed(pub(crate) BoxedHandler);

impl ContextHandler for Fixed {
    fn build(&self, _ctx: Arc<Context>) -> BoxedHandler {
        Arc::clone(&self.0)
    }
}

/// Terminal handler built from `Fn(Arc<Context>, Request) -> Fut`.
pub(crate) struct ContextFn<F>(pub(crate) Arc<F>);

impl<F, Fut, R> ContextHandler for ContextFn<F>
where
    F: Fn(Arc<Context>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn build(&self, ctx: Arc<Context>) -> BoxedHandler {
        let f = Arc::clone(&self.0);
        handler_fn(move |req| (*f)(Arc::clone(&ctx), req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn request() -> Request {
        http::Request::new(bytes::Bytes::new()).into()
    }

    #[tokio::test]
    async fn handler_fn_converts_output() {
        let h = handler_fn(|_req: Request| async { StatusCode::NO_CONTENT });
        let res = h.call(request()).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn arc_of_handler_is_a_handler() {
        let inner = handler_fn(|_req: Request| async { "inner" });
        let outer = Arc::new(Arc::clone(&inner));
        assert_eq!(outer.call(request()).await.body(), "inner".as_bytes());
    }

    #[tokio::test]
    async fn context_fn_sees_the_built_context() {
        let ctx = Arc::new(Context::new());
        ctx.put("flip", "flop");

        let terminal = ContextFn(Arc::new(|ctx: Arc<Context>, _req: Request| async move {
            match ctx.get_as::<&str>("flip") {
                Ok(v) => format!("flip={v}"),
                Err(_) => "missing".to_owned(),
            }
        }));
        let h = terminal.build(ctx);
        assert_eq!(h.call(request()).await.body(), "flip=flop".as_bytes());
    }
}
