//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The router, every group and every request chain hold handlers of
//! *different* concrete types in one `Vec`. We erase them behind
//! `Arc<dyn Fn(&mut Context)>` so they can be stored uniformly and shared by
//! all concurrent requests:
//!
//! ```text
//! fn hello(c: &mut Context) { … }        ← user writes this
//!        ↓ engine.get("/", hello)
//! hello.into_handler_func()              ← Handler blanket impl
//!        ↓
//! Arc::new(hello)                        ← stored as HandlerFunc
//!        ↓  cloned into the per-request chain
//! handler(&mut context)                  ← one virtual call
//! ```
//!
//! Building a chain costs one atomic increment per handler.

use std::sync::Arc;

use crate::context::Context;

/// A type-erased handler shared across concurrent requests.
///
/// Middlewares and route handlers have the same type: whatever runs before
/// [`Context::next`] is the "before" half, whatever runs after it is the
/// "after" half.
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// fn name(c: &mut Context)
/// ```
///
/// Closures need their argument annotated: `|c: &mut Context| { … }`.
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_handler_func(self) -> HandlerFunc;
}

mod private {
    pub trait Sealed {}
}

impl<F> private::Sealed for F where F: Fn(&mut Context) + Send + Sync + 'static {}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_handler_func(self) -> HandlerFunc {
        Arc::new(self)
    }
}
