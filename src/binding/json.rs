use serde::de::DeserializeOwned;

use super::Binding;
use crate::error::BindError;
use crate::request::Request;

/// Decodes the request body as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonBinding;

impl Binding for JsonBinding {
    fn name(&self) -> &'static str {
        "json"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request) -> Result<T, BindError> {
        Ok(serde_json::from_slice(req.body())?)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u8,
    }

    fn request(body: &'static str) -> Request {
        http::Request::post("/users")
            .header("content-type", "application/json")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
            .into()
    }

    #[test]
    fn decodes_body() {
        let user: User = JsonBinding.bind(&request(r#"{"name":"alice","age":30}"#)).unwrap();
        assert_eq!(user, User { name: "alice".into(), age: 30 });
    }

    #[test]
    fn empty_body_is_an_error() {
        let err = JsonBinding.bind::<User>(&request("")).unwrap_err();
        assert!(matches!(err, BindError::Json(_)));
    }
}
