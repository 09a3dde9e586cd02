#![allow(dead_code)]

use bytes::Bytes;
use cob::Request;

pub fn get(uri: &str) -> Request {
    http::Request::get(uri).body(Bytes::new()).unwrap().into()
}

pub fn post(uri: &str) -> Request {
    http::Request::post(uri).body(Bytes::new()).unwrap().into()
}

pub fn post_form(uri: &str, body: &'static str) -> Request {
    http::Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
        .into()
}

pub fn post_json(uri: &str, body: &'static str) -> Request {
    http::Request::post(uri)
        .header("content-type", "application/json; charset=utf-8")
        .body(Bytes::from_static(body.as_bytes()))
        .unwrap()
        .into()
}

pub fn body(res: &http::Response<Bytes>) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}
