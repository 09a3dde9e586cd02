//! Form binding.
//!
//! Values are gathered into `name -> [values]` from the request body
//! (`application/x-www-form-urlencoded` for POST/PUT/PATCH, or the text
//! parts of `multipart/form-data`) followed by the URL query, then handed
//! to a serde deserializer:
//!
//! - keys without a matching field are ignored;
//! - sequence fields (`Vec<T>`, tuples) take every value of their key;
//! - scalar fields take the last value, parsed as needed;
//! - `Option<T>` is `None` when the key is absent.

use std::collections::HashMap;
use std::fmt;

use http::Method;
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;

use super::{Binding, MIME_MULTIPART_POST_FORM, MIME_POST_FORM, multipart};
use crate::error::BindError;
use crate::request::Request;

pub(crate) type FormValues = HashMap<String, Vec<String>>;

/// Decodes form fields and query parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormBinding;

impl Binding for FormBinding {
    fn name(&self) -> &'static str {
        "form"
    }

    fn bind<T: DeserializeOwned>(&self, req: &Request) -> Result<T, BindError> {
        let values = form_values(req)?;
        from_values(&values)
    }
}

/// Collects the form values of `req`: body first, then query.
pub(crate) fn form_values(req: &Request) -> Result<FormValues, BindError> {
    let mut values = FormValues::new();
    let mut push = |key: String, value: String| values.entry(key).or_default().push(value);

    let content_type = req.header("content-type").unwrap_or("");
    let media_type = content_type.split(';').next().unwrap_or("").trim();

    let has_body = matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH);
    if has_body && media_type == MIME_POST_FORM {
        for (key, value) in url::form_urlencoded::parse(req.body()) {
            push(key.into_owned(), value.into_owned());
        }
    }
    if media_type == MIME_MULTIPART_POST_FORM {
        for (key, value) in multipart::text_fields(content_type, req.body())? {
            push(key, value);
        }
    }
    if let Some(query) = req.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            push(key.into_owned(), value.into_owned());
        }
    }

    Ok(values)
}

pub(crate) fn from_values<T: DeserializeOwned>(values: &FormValues) -> Result<T, BindError> {
    let fields = values
        .iter()
        .map(|(key, values)| (key.as_str(), Field { key, values }));
    let map: MapDeserializer<'_, _, FormError> = MapDeserializer::new(fields);
    T::deserialize(map).map_err(|e| match e.field {
        Some(field) => BindError::Form { field, message: e.message },
        None => BindError::Custom(e.message),
    })
}

// ── Deserializer ─────────────────────────────────────────────────────────────

#[derive(Debug)]
struct FormError {
    field: Option<String>,
    message: String,
}

impl FormError {
    fn at(field: &str, message: impl Into<String>) -> Self {
        Self { field: Some(field.to_owned()), message: message.into() }
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FormError {}

impl de::Error for FormError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self { field: None, message: msg.to_string() }
    }

    fn missing_field(field: &'static str) -> Self {
        Self::at(field, "missing field")
    }
}

/// All values of one key.
#[derive(Clone, Copy)]
struct Field<'a> {
    key: &'a str,
    values: &'a [String],
}

impl<'a> Field<'a> {
    fn last(&self) -> Result<&'a str, FormError> {
        self.values
            .last()
            .map(String::as_str)
            .ok_or_else(|| FormError::at(self.key, "missing value"))
    }

    fn parse<T>(&self) -> Result<T, FormError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let value = self.last()?;
        value
            .trim()
            .parse()
            .map_err(|e| FormError::at(self.key, format!("invalid value {value:?}: {e}")))
    }

    fn parse_bool(&self) -> Result<bool, FormError> {
        match self.last()? {
            "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => Ok(false),
            other => Err(FormError::at(self.key, format!("invalid bool {other:?}"))),
        }
    }

    fn elements(self) -> impl Iterator<Item = Field<'a>> {
        self.values
            .iter()
            .map(move |value| Field { key: self.key, values: std::slice::from_ref(value) })
    }
}

impl<'de> IntoDeserializer<'de, FormError> for Field<'_> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
                visitor.$visit(self.parse()?)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Field<'_> {
    type Error = FormError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_str(self.last()?)
    }

    deserialize_parsed! {
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_bool(self.parse_bool()?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        if self.values.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        SeqDeserializer::new(self.elements()).deserialize_any(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, FormError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, FormError> {
        visitor.visit_enum(self.last()?.into_deserializer())
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, FormError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit unit_struct
        tuple_struct map struct identifier
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        name: String,
        age: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Role {
        Admin,
        Guest,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        #[serde(rename = "user_name")]
        name: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        scores: Vec<i16>,
        ratio: f64,
        active: bool,
        nickname: Option<String>,
        role: Role,
    }

    fn post(content_type: &str, uri: &str, body: &'static str) -> Request {
        http::Request::post(uri)
            .header("content-type", content_type)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
            .into()
    }

    #[test]
    fn binds_urlencoded_body() {
        let req = post(MIME_POST_FORM, "/login", "name=alice&age=30");
        let login: Login = FormBinding.bind(&req).unwrap();
        assert_eq!(login, Login { name: "alice".into(), age: 30 });
    }

    #[test]
    fn ignores_unknown_keys_and_collects_repeats() {
        let req = post(
            "application/x-www-form-urlencoded; charset=utf-8",
            "/profile?tags=c",
            "user_name=bob&tags=a&tags=b&scores=-1&scores=7&ratio=0.5&active=on&role=admin&extra=1",
        );
        let profile: Profile = FormBinding.bind(&req).unwrap();
        assert_eq!(profile.name, "bob");
        assert_eq!(profile.tags, ["a", "b", "c"]);
        assert_eq!(profile.scores, [-1, 7]);
        assert_eq!(profile.ratio, 0.5);
        assert!(profile.active);
        assert_eq!(profile.nickname, None);
        assert_eq!(profile.role, Role::Admin);
    }

    #[test]
    fn scalar_takes_last_value() {
        let req = post(MIME_POST_FORM, "/login", "name=a&name=b&age=1");
        let login: Login = FormBinding.bind(&req).unwrap();
        assert_eq!(login.name, "b");
    }

    #[test]
    fn get_requests_bind_from_query_only() {
        let req: Request = http::Request::get("/login?name=carol&age=41")
            .header("content-type", MIME_POST_FORM)
            .body(Bytes::from_static(b"name=ignored"))
            .unwrap()
            .into();
        let login: Login = FormBinding.bind(&req).unwrap();
        assert_eq!(login, Login { name: "carol".into(), age: 41 });
    }

    #[test]
    fn bad_number_names_the_field() {
        let req = post(MIME_POST_FORM, "/login", "name=alice&age=old");
        let err = FormBinding.bind::<Login>(&req).unwrap_err();
        match err {
            BindError::Form { field, message } => {
                assert_eq!(field, "age");
                assert!(message.starts_with("invalid value \"old\""), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_field_is_reported() {
        let req = post(MIME_POST_FORM, "/login", "name=alice");
        let err = FormBinding.bind::<Login>(&req).unwrap_err();
        assert_eq!(err.to_string(), "form: age: missing field");
    }

    #[test]
    fn errors_without_a_field_are_custom() {
        #[derive(Debug, Deserialize)]
        #[serde(try_from = "String")]
        struct Even(u32);

        impl TryFrom<String> for Even {
            type Error = String;

            fn try_from(value: String) -> Result<Self, String> {
                match value.parse::<u32>() {
                    Ok(n) if n % 2 == 0 => Ok(Self(n)),
                    _ => Err(format!("{value} is not even")),
                }
            }
        }

        #[derive(Debug, Deserialize)]
        struct Pick {
            #[allow(dead_code)]
            n: Even,
        }

        let values = FormValues::from([("n".to_owned(), vec!["3".to_owned()])]);
        let err = from_values::<Pick>(&values).unwrap_err();
        assert!(matches!(&err, BindError::Custom(message) if message == "3 is not even"), "{err}");
    }

    #[test]
    fn guest_role_parses() {
        let values = FormValues::from([("role".to_owned(), vec!["guest".to_owned()])]);
        #[derive(Deserialize)]
        struct OnlyRole {
            role: Role,
        }
        let parsed: OnlyRole = from_values(&values).unwrap();
        assert_eq!(parsed.role, Role::Guest);
    }
}
