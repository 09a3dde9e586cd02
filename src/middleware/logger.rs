//! Access log.

use std::time::Instant;

use tracing::info;

use crate::context::Context;

/// Logs method, path, final status and latency of every request once the
/// rest of the chain has run.
pub fn logger() -> impl Fn(&mut Context) + Send + Sync + 'static {
    |c: &mut Context| {
        let start = Instant::now();
        c.next();
        info!(
            method = %c.method(),
            path = c.path(),
            status = c.writer.status(),
            elapsed = ?start.elapsed(),
            "request",
        );
    }
}
