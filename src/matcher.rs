//! Route matching logic.
//!
//! Matches request URLs against the route table and resolves the matched
//! handler into a [`Reply`].

use crate::error::{FetchError, Result};
use crate::handler::{Callback, Entry, Handler, Method, Reply};
use crate::server::RequestOptions;
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::fmt;

/// A handler resolved to its shape.
#[derive(Clone)]
pub enum Rule {
    /// Invoked for every method.
    Callback(Callback),
    /// Keys are all recognized HTTP methods.
    MethodTable(Vec<(Method, Entry)>),
    /// Returned verbatim for every method.
    Fixture(Value),
    /// Method keys mixed with other keys. Fails when dispatched.
    Mixed { keys: Vec<String> },
}

impl Rule {
    /// Classify a handler by shape.
    pub fn classify(handler: Handler) -> Self {
        match handler {
            Handler::Callback(cb) => Rule::Callback(cb),
            Handler::Value(Value::Object(map)) => Self::classify_object(
                map.into_iter().map(|(k, v)| (k, Entry::Value(v))).collect(),
            ),
            Handler::Value(value) => Rule::Fixture(value),
            Handler::Object(entries) => Self::classify_object(entries),
        }
    }

    fn classify_object(entries: Vec<(String, Entry)>) -> Self {
        let method_keys = entries
            .iter()
            .filter(|(key, _)| Method::from_key(key).is_some())
            .count();

        // An empty object counts as a method table with no methods
        if method_keys == entries.len() {
            let table = entries
                .into_iter()
                .filter_map(|(key, entry)| Method::from_key(&key).map(|m| (m, entry)))
                .collect();
            return Rule::MethodTable(table);
        }

        if method_keys > 0 {
            return Rule::Mixed {
                keys: entries.into_iter().map(|(key, _)| key).collect(),
            };
        }

        // Callbacks have no JSON form and drop out of fixtures
        let fixture: Map<String, Value> = entries
            .into_iter()
            .filter_map(|(key, entry)| match entry {
                Entry::Value(value) => Some((key, value)),
                Entry::Callback(_) => None,
            })
            .collect();
        Rule::Fixture(Value::Object(fixture))
    }

    /// Short name of the rule shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::Callback(_) => "callback",
            Rule::MethodTable(_) => "method_table",
            Rule::Fixture(_) => "fixture",
            Rule::Mixed { .. } => "mixed",
        }
    }

    /// Produce the reply for a request.
    pub fn reply(&self, url: &str, method: &str, params: &Value) -> Result<Reply> {
        match self {
            Rule::Callback(cb) => Ok(cb(url, params)),
            Rule::MethodTable(entries) => {
                let matched = entries.iter().find(|(m, _)| m.as_str() == method);
                match matched {
                    // GET entries are fixtures, never invoked
                    Some((Method::Get, Entry::Value(value))) => Ok(Reply::Value(value.clone())),
                    Some((Method::Get, Entry::Callback(_))) => Err(FetchError::CallableFixture {
                        url: url.to_string(),
                    }),
                    Some((_, Entry::Callback(cb))) => Ok(cb(url, params)),
                    // Static value for a non-GET method acts as a constant callback
                    Some((_, Entry::Value(value))) => Ok(Reply::Value(value.clone())),
                    None => Err(FetchError::MissingResponse {
                        method: method.to_string(),
                        url: url.to_string(),
                    }),
                }
            }
            Rule::Fixture(value) => Ok(Reply::Value(value.clone())),
            Rule::Mixed { .. } => Err(FetchError::MixedHandlerConfiguration),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Callback(_) => f.write_str("Callback(..)"),
            Rule::MethodTable(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(m, e)| (m.as_str(), e)))
                .finish(),
            Rule::Fixture(value) => f.debug_tuple("Fixture").field(value).finish(),
            Rule::Mixed { keys } => f.debug_struct("Mixed").field("keys", keys).finish(),
        }
    }
}

/// A route key paired with its rule.
#[derive(Debug, Clone)]
pub struct Route {
    /// Substring matched against request URLs
    pub key: String,
    /// Resolved handler
    pub rule: Rule,
}

/// Result of matching a URL against the table.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// Position of the route in the table
    pub index: usize,
    /// The matched route
    pub route: &'a Route,
}

/// Ordered route table. First match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    pub fn route(mut self, key: impl Into<String>, handler: impl Into<Handler>) -> Self {
        self.routes.push(Route {
            key: key.into(),
            rule: Rule::classify(handler.into()),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Keys of routes that mix method names with other keys.
    pub fn mixed_routes(&self) -> Vec<&str> {
        self.routes
            .iter()
            .filter(|r| matches!(r.rule, Rule::Mixed { .. }))
            .map(|r| r.key.as_str())
            .collect()
    }

    /// Routes that can never match, paired with the earlier route that takes
    /// their URLs: any URL containing the later key contains the earlier one.
    pub fn shadowed_routes(&self) -> Vec<(usize, usize)> {
        self.routes
            .iter()
            .enumerate()
            .filter_map(|(later, route)| {
                self.routes[..later]
                    .iter()
                    .position(|earlier| route.key.contains(earlier.key.as_str()))
                    .map(|earlier| (later, earlier))
            })
            .collect()
    }

    /// Find the first route whose key is a substring of `url`.
    pub fn find_match(&self, url: &str) -> Option<MatchResult<'_>> {
        self.routes
            .iter()
            .enumerate()
            .find(|(_, route)| url.contains(route.key.as_str()))
            .map(|(index, route)| MatchResult { index, route })
    }
}

impl<K, H> FromIterator<(K, H)> for RouteTable
where
    K: Into<String>,
    H: Into<Handler>,
{
    fn from_iter<I: IntoIterator<Item = (K, H)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(RouteTable::new(), |table, (key, handler)| table.route(key, handler))
    }
}

/// Derive the params handed to handlers.
///
/// A non-empty body is parsed as JSON, falling back to the raw string when
/// the text is not JSON. Without a body the params are the request options.
/// Bodies nested past the parser's depth limit are rejected rather than
/// passed through as text.
pub fn normalize_params(options: &RequestOptions) -> Result<Value> {
    match options.body.as_deref() {
        Some(body) if !body.is_empty() => match serde_json::from_str::<Value>(body) {
            Ok(value) => Ok(value),
            Err(e) if is_recursion_limit(&e) => Err(FetchError::InvalidRequestBody {
                body: body.to_string(),
            }),
            Err(e) if matches!(e.classify(), Category::Syntax | Category::Eof) => {
                Ok(Value::String(body.to_string()))
            }
            Err(_) => Err(FetchError::InvalidRequestBody {
                body: body.to_string(),
            }),
        },
        _ => Ok(serde_json::to_value(options)?),
    }
}

// serde_json reports its nesting limit as a syntax error
fn is_recursion_limit(err: &serde_json::Error) -> bool {
    err.classify() == Category::Syntax && err.to_string().starts_with("recursion limit exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn reply_value(reply: Reply) -> Value {
        match reply {
            Reply::Value(value) => value,
            other => panic!("Expected value reply, got {:?}", other),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::new()
            .route("/api", json!("broad"))
            .route("/api/users", json!("specific"));

        let result = table.find_match("https://host/api/users").unwrap();
        assert_eq!(result.index, 0);
        assert_eq!(result.route.key, "/api");
        assert_eq!(table.shadowed_routes(), vec![(1, 0)]);
    }

    #[test]
    fn test_substring_matching() {
        let table = RouteTable::new().route("foo.json", json!("bar"));

        assert!(table.find_match("https://myserver/foo.json?x=1").is_some());
        assert!(table.find_match("https://myserver/foo.yaml").is_none());
    }

    #[test]
    fn test_classify_shapes() {
        let cases = [
            (Handler::from(json!("hello")), "fixture"),
            (Handler::from(json!({"token": "xyz", "x-token": "sce"})), "fixture"),
            (Handler::from(json!({"GET": {"v": 1}})), "method_table"),
            (Handler::from(json!({})), "method_table"),
            (Handler::from(json!({"GOT": {}, "POST": {}})), "mixed"),
            (Handler::callback(|_, _| json!(null)), "callback"),
        ];

        for (handler, kind) in cases {
            assert_eq!(Rule::classify(handler).kind(), kind);
        }
    }

    #[test]
    fn test_get_entry_returned_as_is() {
        let rule = Rule::classify(Handler::from(json!({"GET": {"v": 1}})));
        let reply = rule.reply("/r", "GET", &json!({})).unwrap();
        assert_eq!(reply_value(reply), json!({"v": 1}));
    }

    #[test]
    fn test_get_callback_is_not_invoked() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let rule = Rule::classify(
            Handler::object()
                .callback("GET", move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    json!("called")
                })
                .into(),
        );

        let result = rule.reply("/r", "GET", &json!({}));
        assert!(matches!(result, Err(FetchError::CallableFixture { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_method_callback_receives_params() {
        let rule = Rule::classify(
            Handler::object()
                .get(json!({"v": 1}))
                .post(|url, params| json!({"url": url, "params": params.clone()}))
                .into(),
        );

        let reply = rule.reply("/r", "POST", &json!({"a": 1})).unwrap();
        assert_eq!(reply_value(reply), json!({"url": "/r", "params": {"a": 1}}));
    }

    #[test]
    fn test_missing_method() {
        let rule = Rule::classify(Handler::from(json!({"GET": {"v": 1}})));

        let result = rule.reply("/r", "DELETE", &json!({}));
        assert!(matches!(result, Err(FetchError::MissingResponse { ref method, .. }) if method == "DELETE"));

        // Method comparison is exact
        assert!(rule.reply("/r", "get", &json!({})).is_err());
    }

    #[test]
    fn test_mixed_fails_for_every_method() {
        let rule = Rule::classify(Handler::from(json!({"GOT": {"v": 1}, "POST": {"v": 2}})));

        for method in ["GET", "POST", "PUT"] {
            let result = rule.reply("/r", method, &json!({}));
            assert!(matches!(result, Err(FetchError::MixedHandlerConfiguration)));
        }
    }

    #[test]
    fn test_fixture_drops_callbacks() {
        let rule = Rule::classify(
            Handler::object()
                .value("token", json!("xyz"))
                .callback("refresh", |_, _| json!("ignored"))
                .into(),
        );

        let reply = rule.reply("/auth", "POST", &json!({})).unwrap();
        assert_eq!(reply_value(reply), json!({"token": "xyz"}));
    }

    #[test]
    fn test_normalize_json_body() {
        let options = RequestOptions::post(r#"{"url": "www.google.com"}"#);
        assert_eq!(
            normalize_params(&options).unwrap(),
            json!({"url": "www.google.com"})
        );
    }

    #[test]
    fn test_normalize_non_json_body() {
        for body in ["not-json{", "www.google.com", "{\"open\": "] {
            let options = RequestOptions::post(body);
            assert_eq!(normalize_params(&options).unwrap(), json!(body));
        }
    }

    #[test]
    fn test_deeply_nested_body_is_invalid() {
        let body = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let options = RequestOptions::post(body.clone());

        match normalize_params(&options) {
            Err(err @ FetchError::InvalidRequestBody { .. }) => {
                assert_eq!(err.to_string(), format!("Invalid body: {}", body));
            }
            other => panic!("Expected InvalidRequestBody, got {:?}", other),
        }

        // Nesting within the limit still parses
        let shallow = format!("{}{}", "[".repeat(100), "]".repeat(100));
        let parsed = normalize_params(&RequestOptions::post(shallow)).unwrap();
        assert!(parsed.is_array());
    }

    #[test]
    fn test_normalize_without_body() {
        let options = RequestOptions::get().with_credentials("include");
        assert_eq!(
            normalize_params(&options).unwrap(),
            json!({"method": "GET", "credentials": "include"})
        );

        let empty = RequestOptions::default().with_body("");
        assert_eq!(normalize_params(&empty).unwrap(), json!({"body": ""}));
    }

    #[test]
    fn test_from_iterator_keeps_order() {
        let table: RouteTable = vec![("/b", json!(1)), ("/a", json!(2))].into_iter().collect();
        let keys: Vec<_> = table.routes().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["/b", "/a"]);
        assert!(table.mixed_routes().is_empty());
    }
}
