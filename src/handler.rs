//! Route handlers as written by test authors.
//!
//! A route maps to a [`Handler`]: a callback, a JSON value, or a keyed object
//! of [`Entry`] members. Keyed objects whose keys are all HTTP method names
//! act as method tables; any other keyed object is a fixture.

use crate::error::Result;
use crate::response::FetchResponse;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP method names recognized as method-table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Patch,
        Method::Put,
        Method::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Recognize a method-table key. Matching is case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == key)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Unrecognized HTTP method: {}", s))
    }
}

/// A response that resolves later.
pub type ResponseFuture = BoxFuture<'static, Result<FetchResponse>>;

/// Request callback: `(url, params) -> reply`.
pub type Callback = Arc<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

/// What a callback hands back.
pub enum Reply {
    /// A JSON value, serialized into a `200 application/json` response.
    Value(Value),
    /// A fully built response.
    Response(FetchResponse),
    /// A response that is still being produced.
    Pending(ResponseFuture),
}

impl Reply {
    /// Reply with a response future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<FetchResponse>> + Send + 'static,
    {
        Reply::Pending(future.boxed())
    }

    /// Reply with a future JSON value.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Value> + Send + 'static,
    {
        Reply::Pending(async move { FetchResponse::from_json(&future.await) }.boxed())
    }

    /// Normalize into a response future.
    pub(crate) fn into_future(self) -> ResponseFuture {
        match self {
            Reply::Value(value) => futures::future::ready(FetchResponse::from_json(&value)).boxed(),
            Reply::Response(response) => futures::future::ready(Ok(response)).boxed(),
            Reply::Pending(future) => future,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<FetchResponse> for Reply {
    fn from(response: FetchResponse) -> Self {
        Reply::Response(response)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Reply::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Reply::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Wrap a closure as a [`Callback`].
pub fn callback<F, R>(f: F) -> Callback
where
    F: Fn(&str, &Value) -> R + Send + Sync + 'static,
    R: Into<Reply>,
{
    Arc::new(move |url: &str, params: &Value| f(url, params).into())
}

/// A member of a keyed handler object.
#[derive(Clone)]
pub enum Entry {
    Value(Value),
    Callback(Callback),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Entry::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// The handler attached to a route.
#[derive(Clone)]
pub enum Handler {
    /// Invoked with `(url, params)` for every method.
    Callback(Callback),
    /// A JSON value. Objects are treated as keyed handler objects.
    Value(Value),
    /// Keyed members in insertion order.
    Object(Vec<(String, Entry)>),
}

impl Handler {
    /// Handler backed by a callback.
    pub fn callback<F, R>(f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        Handler::Callback(callback(f))
    }

    /// Start an empty keyed handler object.
    pub fn object() -> HandlerObject {
        HandlerObject::default()
    }
}

impl From<Value> for Handler {
    fn from(value: Value) -> Self {
        Handler::Value(value)
    }
}

impl From<HandlerObject> for Handler {
    fn from(object: HandlerObject) -> Self {
        Handler::Object(object.entries)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Callback(_) => f.write_str("Callback(..)"),
            Handler::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Handler::Object(entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
        }
    }
}

/// Builder for keyed handler objects.
///
/// ```
/// use fetch_stub_server::Handler;
/// use serde_json::json;
///
/// let handler: Handler = Handler::object()
///     .get(json!({"v": 1}))
///     .post(|_url, _params| json!({"v": 2}))
///     .into();
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerObject {
    entries: Vec<(String, Entry)>,
}

impl HandlerObject {
    /// Insert or replace a member.
    pub fn entry(mut self, key: impl Into<String>, entry: Entry) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((key, entry)),
        }
        self
    }

    pub fn value(self, key: impl Into<String>, value: Value) -> Self {
        self.entry(key, Entry::Value(value))
    }

    pub fn callback<F, R>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.entry(key, Entry::Callback(callback(f)))
    }

    /// GET fixture. GET entries are returned as-is, never invoked.
    pub fn get(self, value: Value) -> Self {
        self.value(Method::Get.as_str(), value)
    }

    pub fn post<F, R>(self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.callback(Method::Post.as_str(), f)
    }

    pub fn patch<F, R>(self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.callback(Method::Patch.as_str(), f)
    }

    pub fn put<F, R>(self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.callback(Method::Put.as_str(), f)
    }

    pub fn delete<F, R>(self, f: F) -> Self
    where
        F: Fn(&str, &Value) -> R + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.callback(Method::Delete.as_str(), f)
    }
}
