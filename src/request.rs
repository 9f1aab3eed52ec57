//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body already collected.
///
/// The server builds these from hyper; tests and routers build them from
/// any `http::Request<Bytes>`:
///
/// ```rust
/// use ctxstack::Request;
///
/// let req: Request = http::Request::get("/users/42")
///     .body(bytes::Bytes::new())
///     .unwrap()
///     .into();
/// assert_eq!(req.path(), "/users/42");
/// ```
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Bytes>,
}

impl Request {
    pub fn method(&self) -> &Method { self.inner.method() }
    pub fn uri(&self) -> &Uri { self.inner.uri() }
    pub fn path(&self) -> &str { self.inner.uri().path() }
    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &Bytes { self.inner.body() }

    /// Header lookup. Names are case-insensitive; values that are not visible
    /// ASCII read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    pub fn into_inner(self) -> http::Request<Bytes> {
        self.inner
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(inner: http::Request<Bytes>) -> Self {
        Self { inner }
    }
}
