//! Chain composition.
//!
//! A [`Chain`] is an open template: an ordered list of middleware and a base
//! [`Context`]. Closing it with one of the `then*` methods attaches the
//! terminal handler and yields a [`ClosedChain`], the only type that can
//! serve a request. `ClosedChain` has no `append`, so extending a finished
//! chain does not compile.
//!
//! Both types are immutable values. Every structural operation returns a new
//! value and leaves the receiver alone, so one chain can be the common prefix
//! of many others, and one closed chain can serve any number of concurrent
//! requests.
//!
//! # Request flow
//!
//! For `Chain::new().append(a).append(b).then(h)` each request:
//!
//! 1. copies the base context into a fresh `Arc<Context>`,
//! 2. builds `h` for that context,
//! 3. folds right to left: `b` wraps `h`, then `a` wraps the result,
//! 4. calls the outermost handler.
//!
//! So `a` runs first on the way in and last on the way out.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use crate::context::Context;
use crate::handler::{BoxFuture, BoxedHandler, ContextFn, ContextHandler, Fixed, Handler, handler_fn};
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::request::Request;
use crate::response::IntoResponse;

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An appendable sequence of middleware awaiting a terminal handler.
#[derive(Clone, Default)]
pub struct Chain {
    middleware: Arc<[BoxedMiddleware]>,
    base: Arc<Context>,
}

impl Chain {
    /// An empty chain with an empty base context.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty chain seeded with `base`.
    ///
    /// Use this when some values must be in place before the first
    /// middleware runs. Every request starts from a copy of `base`.
    pub fn init(base: Context) -> Self {
        Self { base: Arc::new(base), ..Self::default() }
    }

    /// Returns a chain that runs `self`'s middleware, then `mw`.
    ///
    /// The receiver is untouched: appending different middleware to the same
    /// chain from two places gives two unrelated chains.
    pub fn append(&self, mw: impl Middleware) -> Self {
        self.extend([BoxedMiddleware::new(mw)])
    }

    /// Like [`append`](Chain::append) for any number of middleware, in order.
    pub fn extend<I>(&self, mw: I) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
    {
        let middleware: Vec<_> = self.middleware.iter().cloned().chain(mw).collect();
        Self { middleware: middleware.into(), base: Arc::clone(&self.base) }
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Closes the chain with a handler built per request from its context.
    pub fn then(&self, handler: impl ContextHandler) -> ClosedChain {
        ClosedChain {
            middleware: Arc::clone(&self.middleware),
            handler: Arc::new(handler),
            base: Arc::clone(&self.base),
        }
    }

    /// Closes the chain with a handler that does not need the context.
    pub fn then_handler(&self, handler: impl Handler) -> ClosedChain {
        self.then(Fixed(handler.into_boxed_handler()))
    }

    /// Closes the chain with a plain async function of the request.
    pub fn then_handler_fn<F, Fut, R>(&self, f: F) -> ClosedChain
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.then(Fixed(handler_fn(f)))
    }

    /// Closes the chain with an async function of the context and request.
    pub fn then_context_fn<F, Fut, R>(&self, f: F) -> ClosedChain
    where
        F: Fn(Arc<Context>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        self.then(ContextFn(Arc::new(f)))
    }
}

impl FromIterator<BoxedMiddleware> for Chain {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Chain::new().extend(iter)
    }
}

// ── ClosedChain ───────────────────────────────────────────────────────────────

/// A chain with its terminal handler attached.
///
/// Implements [`Handler`], so it can be served directly or mounted wherever
/// a handler is accepted. Cloning is cheap and shares the middleware.
#[derive(Clone)]
pub struct ClosedChain {
    middleware: Arc<[BoxedMiddleware]>,
    handler: Arc<dyn ContextHandler>,
    base: Arc<Context>,
}

impl ClosedChain {
    /// A copy of the base context. Changing it affects nothing until it is
    /// handed back through [`reinit`](ClosedChain::reinit).
    pub fn base_ctx(&self) -> Context {
        self.base.copy()
    }

    /// The same middleware and handler over a new base context.
    ///
    /// Typical use is per request, by something upstream that learned a value
    /// the chain should start with (a path parameter, a tenant id). `self`
    /// keeps its own base.
    pub fn reinit(&self, base: Context) -> ClosedChain {
        ClosedChain {
            middleware: Arc::clone(&self.middleware),
            handler: Arc::clone(&self.handler),
            base: Arc::new(base),
        }
    }

    /// [`base_ctx`](ClosedChain::base_ctx), one `put`, then
    /// [`reinit`](ClosedChain::reinit).
    pub fn inject<T>(&self, key: impl Into<String>, value: T) -> ClosedChain
    where
        T: Any + Send + Sync,
    {
        let base = self.base_ctx();
        base.put(key, value);
        self.reinit(base)
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Builds the per-request handler stack around a fresh context copy.
    fn compose(&self, ctx: Arc<Context>) -> BoxedHandler {
        self.middleware
            .iter()
            .rev()
            .fold(self.handler.build(Arc::clone(&ctx)), |next, mw| {
                mw.wrap(Arc::clone(&ctx), next)
            })
    }
}

impl Handler for ClosedChain {
    fn call(&self, req: Request) -> BoxFuture {
        trace!(middleware = self.middleware.len(), path = req.path(), "invoking chain");
        let ctx = Arc::new(self.base.copy());
        self.compose(ctx).call(req)
    }
}
