//! Request binding: decoding a request into a typed value.
//!
//! Two binders ship with cob, and [`default_binding`] picks one from the
//! request's media type:
//!
//! | Content-Type | Binder |
//! |---|---|
//! | `application/json` | [`JSON`] |
//! | `multipart/form-data` | [`FORM`] |
//! | anything else, or none | [`FORM`] |
//!
//! Targets are ordinary serde types. Form field names are the serde field
//! names, so `#[serde(rename = "...")]` maps a field to another key:
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Login {
//!     name: String,
//!     age: u32,
//!     #[serde(default, rename = "tag")]
//!     tags: Vec<String>,
//! }
//! ```

mod form;
mod json;
mod multipart;

use serde::de::DeserializeOwned;

use crate::error::BindError;
use crate::request::Request;

pub(crate) use form::form_values;
pub use form::FormBinding;
pub use json::JsonBinding;

pub const MIME_JSON: &str = "application/json";
pub const MIME_POST_FORM: &str = "application/x-www-form-urlencoded";
pub const MIME_MULTIPART_POST_FORM: &str = "multipart/form-data";

/// Decodes a [`Request`] into a value.
pub trait Binding {
    fn name(&self) -> &'static str;

    fn bind<T: DeserializeOwned>(&self, req: &Request) -> Result<T, BindError>;
}

pub const JSON: JsonBinding = JsonBinding;
pub const FORM: FormBinding = FormBinding;

/// The binder chosen by [`default_binding`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingKind {
    Json,
    Form,
}

impl Binding for BindingKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Json => JSON.name(),
            Self::Form => FORM.name(),
        }
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request) -> Result<T, BindError> {
        match self {
            Self::Json => JSON.bind(req),
            Self::Form => FORM.bind(req),
        }
    }
}

/// Picks a binder for a media type (already stripped of parameters).
pub fn default_binding(content_type: &str) -> BindingKind {
    match content_type {
        MIME_JSON => BindingKind::Json,
        // urlencoded and multipart bodies both go through the form binder
        _ => BindingKind::Form,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binding_by_media_type() {
        assert_eq!(default_binding("application/json"), BindingKind::Json);
        assert_eq!(default_binding("multipart/form-data"), BindingKind::Form);
        assert_eq!(default_binding("application/x-www-form-urlencoded"), BindingKind::Form);
        assert_eq!(default_binding("text/xml"), BindingKind::Form);
        assert_eq!(default_binding(""), BindingKind::Form);
    }
}
