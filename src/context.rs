//! Request-scoped key/value storage.
//!
//! A [`Context`] lives for exactly one pass through a
//! [`ClosedChain`](crate::ClosedChain). Middleware and the terminal handler
//! all receive the same `Arc<Context>`, so a value put by an outer
//! middleware is visible to everything further in. The context can also be
//! cloned (the `Arc`, not the map) into a spawned task. Every operation takes
//! the instance's reader/writer lock, so that sharing is sound.
//!
//! Values are type-erased. Use [`Context::get_as`] or a typed [`Key`] to get
//! a concrete type back:
//!
//! ```rust
//! use ctxstack::{Context, Key};
//!
//! const USER_ID: Key<u64> = Key::new("user_id");
//!
//! let ctx = Context::new();
//! USER_ID.put(&ctx, 42);
//! assert_eq!(*USER_ID.get(&ctx).unwrap(), 42);
//! assert!(ctx.get("session").is_err());
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;

/// A type-erased context value.
///
/// `Arc` so that [`Context::copy`] can share values between the source and
/// the copy without cloning them.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Concurrency-safe, request-scoped key/value store.
#[derive(Default)]
pub struct Context {
    values: RwLock<HashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`, replacing whatever was there.
    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.put_value(key, Arc::new(value));
    }

    /// Like [`put`](Context::put) for a value that is already erased, e.g.
    /// one obtained from [`get`](Context::get) on another context.
    pub fn put_value(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    /// Returns the value stored under `key`.
    ///
    /// A missing key is an ordinary outcome. Callers are expected to match on
    /// [`Error::KeyNotFound`] and fall back.
    pub fn get(&self, key: &str) -> Result<Value, Error> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Returns the value stored under `key` as a `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, Error> {
        self.get(key)?.downcast::<T>().map_err(|_| Error::TypeMismatch {
            key: key.to_owned(),
            expected: type_name::<T>(),
        })
    }

    /// Removes `key`. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        self.values.write().remove(key);
    }

    pub fn exists(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Snapshot of the keys currently present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Returns a context holding the same key/value pairs in its own map.
    ///
    /// Values are shared (`Arc` clones). The maps are independent, so a put or
    /// delete on either side is never seen by the other.
    pub fn copy(&self) -> Context {
        let values = self.values.read().clone();
        Context { values: RwLock::new(values) }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.keys();
        keys.sort_unstable();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

// ── Typed keys ────────────────────────────────────────────────────────────────

/// A context key bound to a value type.
///
/// Declare one `const` per logical key next to the middleware that owns it;
/// every call site then reads and writes a `T` without naming the type again.
/// Nothing stops untyped access to the same name through [`Context`] itself.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Any + Send + Sync> Key<T> {
    pub fn put(&self, ctx: &Context, value: T) {
        ctx.put(self.name, value);
    }

    pub fn get(&self, ctx: &Context) -> Result<Arc<T>, Error> {
        ctx.get_as(self.name)
    }

    pub fn delete(&self, ctx: &Context) {
        ctx.delete(self.name);
    }

    pub fn exists(&self, ctx: &Context) -> bool {
        ctx.exists(self.name)
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(ctx: &Context, key: &str) -> String {
        ctx.get_as::<&str>(key).map(|v| (*v).to_owned()).unwrap()
    }

    #[test]
    fn get_found_and_not_found() {
        let ctx = Context::new();
        ctx.put("flip", "flop");
        ctx.put("bish", ());

        assert_eq!(text(&ctx, "flip"), "flop");
        assert!(ctx.get_as::<()>("bish").is_ok());

        let err = ctx.get("wibble").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), r#"context: key "wibble" does not exist"#);
    }

    #[test]
    fn get_as_wrong_type() {
        let ctx = Context::new();
        ctx.put("count", 3_u32);

        match ctx.get_as::<String>("count") {
            Err(Error::TypeMismatch { key, .. }) => assert_eq!(key, "count"),
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn put_overwrites() {
        let ctx = Context::new();
        ctx.put("bish", "bash");
        ctx.put("bish", "bosh");
        assert_eq!(text(&ctx, "bish"), "bosh");
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn delete_and_exists() {
        let ctx = Context::new();
        ctx.put("flip", "flop");
        assert!(ctx.exists("flip"));

        ctx.delete("flip");
        assert!(!ctx.exists("flip"));
        assert!(ctx.is_empty());

        // deleting again is a no-op
        ctx.delete("flip");
    }

    #[test]
    fn copy_is_independent_both_ways() {
        let ctx = Context::new();
        ctx.put("flip", "flop");

        let ctx2 = ctx.copy();
        ctx2.put("bish", "bash");
        ctx.delete("flip");
        ctx.put("wobble", 1_u8);

        assert!(!ctx.exists("bish"));
        assert_eq!(text(&ctx2, "bish"), "bash");
        assert_eq!(text(&ctx2, "flip"), "flop");
        assert!(!ctx2.exists("wobble"));
    }

    mod copy_model {
        use std::collections::HashMap;

        use proptest::collection::vec;
        use proptest::prelude::*;

        use super::super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Put { on_copy: bool, key: u8, value: u32 },
            Delete { on_copy: bool, key: u8 },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (any::<bool>(), 0..8_u8, any::<u32>())
                    .prop_map(|(on_copy, key, value)| Op::Put { on_copy, key, value }),
                (any::<bool>(), 0..8_u8).prop_map(|(on_copy, key)| Op::Delete { on_copy, key }),
            ]
        }

        fn snapshot(ctx: &Context) -> HashMap<String, u32> {
            ctx.keys()
                .into_iter()
                .map(|k| {
                    let v = *ctx.get_as::<u32>(&k).unwrap();
                    (k, v)
                })
                .collect()
        }

        proptest! {
            #[test]
            fn copy_and_source_track_their_own_writes(
                seed in vec((0..8_u8, any::<u32>()), 0..8),
                ops in vec(op(), 0..32),
            ) {
                let source = Context::new();
                let mut source_model = HashMap::new();
                for (key, value) in seed {
                    source.put(format!("k{key}"), value);
                    source_model.insert(format!("k{key}"), value);
                }

                let copy = source.copy();
                let mut copy_model = source_model.clone();

                for op in ops {
                    match op {
                        Op::Put { on_copy, key, value } => {
                            let (ctx, model) = if on_copy {
                                (&copy, &mut copy_model)
                            } else {
                                (&source, &mut source_model)
                            };
                            ctx.put(format!("k{key}"), value);
                            model.insert(format!("k{key}"), value);
                        }
                        Op::Delete { on_copy, key } => {
                            let (ctx, model) = if on_copy {
                                (&copy, &mut copy_model)
                            } else {
                                (&source, &mut source_model)
                            };
                            ctx.delete(&format!("k{key}"));
                            model.remove(&format!("k{key}"));
                        }
                    }
                }

                prop_assert_eq!(snapshot(&source), source_model);
                prop_assert_eq!(snapshot(&copy), copy_model);
            }
        }
    }

    #[test]
    fn copy_shares_values() {
        let ctx = Context::new();
        ctx.put("shared", vec![1, 2, 3]);

        let ctx2 = ctx.copy();
        let a = ctx.get("shared").unwrap();
        let b = ctx2.get("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn typed_key_round_trip() {
        const HITS: Key<u32> = Key::new("hits");

        let ctx = Context::new();
        assert!(!HITS.exists(&ctx));
        assert!(HITS.get(&ctx).unwrap_err().is_not_found());

        HITS.put(&ctx, 7);
        assert_eq!(*HITS.get(&ctx).unwrap(), 7);
        assert_eq!(*ctx.get_as::<u32>(HITS.name()).unwrap(), 7);

        HITS.delete(&ctx);
        assert!(!HITS.exists(&ctx));
    }

    #[test]
    fn debug_lists_sorted_keys() {
        let ctx = Context::new();
        ctx.put("b", 1);
        ctx.put("a", 2);
        assert_eq!(format!("{ctx:?}"), r#"Context { keys: ["a", "b"] }"#);
    }

    #[test]
    fn shared_with_another_thread() {
        let ctx = Arc::new(Context::new());
        let worker = {
            let ctx = Arc::clone(&ctx);
            std::thread::spawn(move || {
                for i in 0..100 {
                    ctx.put(format!("bg-{i}"), i);
                }
            })
        };
        for i in 0..100 {
            ctx.put(format!("fg-{i}"), i);
            let _ = ctx.exists("bg-0");
        }
        worker.join().unwrap();
        assert_eq!(ctx.len(), 200);
    }
}
