//! Provided middlewares.
//!
//! Both are plain handlers: add them with [`Engine::use_`](crate::Engine::use_)
//! or on any group. [`Engine::default`](crate::Engine::default) installs
//! them on the root group.

mod logger;
mod recovery;

pub use logger::logger;
pub use recovery::recovery;
