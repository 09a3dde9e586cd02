//! Panic containment.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::context::Context;

/// Catches a panic anywhere downstream and answers
/// `500 {"message": "Internal Server Error"}` instead.
///
/// Install it early in the chain: it only protects the handlers that run
/// inside its [`Context::next`] call. Anything already written stays
/// written; the failure body is then appended to it.
pub fn recovery() -> impl Fn(&mut Context) + Send + Sync + 'static {
    |c: &mut Context| {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| c.next())) {
            error!(
                method = %c.method(),
                path = c.path(),
                "recovered from panic: {}",
                panic_message(payload.as_ref()),
            );
            c.fail(500, "Internal Server Error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
