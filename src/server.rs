//! Fetch server: dispatches fetch calls against the route table.

use crate::config::ServerConfig;
use crate::error::{FetchError, Result};
use crate::handler::ResponseFuture;
use crate::install::{self, Fetch, InstallGuard};
use crate::matcher::{normalize_params, RouteTable};
use crate::response::FetchResponse;
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Options accompanying a fetch call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// HTTP method (defaults to GET)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body, usually JSON text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Credentials mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Anything else the caller passes along
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// GET request options.
    pub fn get() -> Self {
        Self::default().with_method("GET")
    }

    /// POST request options with a body.
    pub fn post(body: impl Into<String>) -> Self {
        Self::default().with_method("POST").with_body(body)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize a value as the JSON body.
    pub fn with_json_body<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.with_body(serde_json::to_string(body)?))
    }

    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The method used for dispatch.
    pub fn effective_method(&self) -> &str {
        self.method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("GET")
    }
}

/// Stub that answers fetch calls from a route table.
///
/// Cloning is cheap; clones share the same table.
#[derive(Debug, Clone)]
pub struct FetchServer {
    routes: Arc<RouteTable>,
    config: ServerConfig,
}

impl FetchServer {
    /// Create a server over the given routes.
    pub fn new(routes: RouteTable, config: ServerConfig) -> Self {
        info!(
            routes = routes.len(),
            debug = config.debug,
            "Fetch server initialized"
        );

        Self {
            routes: Arc::new(routes),
            config,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Dispatch a fetch call.
    ///
    /// Matching, body parsing and rule errors are returned immediately. The
    /// returned future resolves to the response; a pending callback keeps it
    /// pending.
    pub fn resolve(&self, url: &str, options: RequestOptions) -> Result<ResponseFuture> {
        let method = options.effective_method().to_string();

        let Some(result) = self.routes.find_match(url) else {
            if self.config.log_unmatched {
                warn!(url = %url, method = %method, "No matching route found");
            }
            return Err(FetchError::NoMatchingRoute {
                url: url.to_string(),
                options: serde_json::to_string(&options)?,
            });
        };

        let params = normalize_params(&options)?;

        if self.config.log_matches {
            info!(
                route = %result.route.key,
                rule = result.route.rule.kind(),
                method = %method,
                url = %url,
                "Request matched route"
            );
        }

        let response = result.route.rule.reply(url, &method, &params)?.into_future();

        if self.config.debug {
            Ok(with_diagnostics(url.to_string(), params, response))
        } else {
            Ok(response)
        }
    }

    /// Dispatch a fetch call and wait for the response.
    pub async fn fetch(&self, url: &str, options: RequestOptions) -> Result<FetchResponse> {
        self.resolve(url, options)?.await
    }

    /// Install this server as the process-wide fetch stub.
    ///
    /// Any previously installed stub is removed first.
    pub fn install(&self) {
        install::install(Arc::new(self.clone()));
    }

    /// Install this server until the returned guard is dropped.
    pub fn install_scoped(&self) -> InstallGuard {
        install::install_scoped(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Fetch for FetchServer {
    async fn fetch(&self, url: &str, options: RequestOptions) -> Result<FetchResponse> {
        FetchServer::fetch(self, url, options).await
    }
}

/// Log a trace of the call once the response and a duplicate of its body
/// have resolved. The caller receives the untouched original.
fn with_diagnostics(url: String, params: Value, response: ResponseFuture) -> ResponseFuture {
    async move {
        let response = response.await?;

        let duplicate = response.clone();
        let status = duplicate.status();
        let content_type = duplicate.content_type().to_string();
        let raw = duplicate.bytes().await;
        let body = serde_json::from_slice::<Value>(&raw)
            .map(|v| pretty(&v))
            .unwrap_or_else(|_| String::from_utf8_lossy(&raw).into_owned());

        info!(
            target: "fetch_stub_server::diagnostics",
            url = %url,
            params = %pretty(&params),
            status,
            content_type = %content_type,
            body = %body,
            "[fetch-server] {}",
            url
        );

        Ok(response)
    }
    .boxed()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
