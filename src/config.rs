//! Configuration for the fetch server.
//!
//! Defines server settings and the YAML route file format.

use crate::matcher::RouteTable;
use crate::server::FetchServer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Trace every dispatched call with its params and response
    #[serde(default)]
    pub debug: bool,

    /// Log matched requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_matches: true,
            log_unmatched: true,
        }
    }
}

impl ServerConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// A route file: settings plus an ordered list of routes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    /// Server settings
    #[serde(default)]
    pub settings: ServerConfig,

    /// Routes in priority order
    #[serde(default)]
    pub routes: Vec<RouteDefinition>,
}

/// A single route definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDefinition {
    /// Substring matched against request URLs
    #[serde(rename = "match")]
    pub key: String,

    /// Optional description
    #[serde(default)]
    pub name: Option<String>,

    /// Fixture value or method table
    pub respond: serde_json::Value,
}

impl RouteFile {
    /// Load a route file from YAML.
    ///
    /// Problems found by [`RouteFile::validate`] are logged, not fatal; a bad
    /// route only fails when a request reaches it.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file = Self::from_yaml(&content)?;
        for problem in file.problems() {
            warn!(path = %path.display(), "{}", problem);
        }
        Ok(file)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build the route table.
    pub fn to_table(&self) -> RouteTable {
        self.routes
            .iter()
            .map(|route| (route.key.clone(), route.respond.clone()))
            .collect()
    }

    /// Build a server over these routes.
    pub fn into_server(self) -> FetchServer {
        let table = self.to_table();
        FetchServer::new(table, self.settings)
    }

    /// Fail if any route is misconfigured or unreachable.
    pub fn validate(&self) -> anyhow::Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{}", problems.join("; "))
        }
    }

    fn problems(&self) -> Vec<String> {
        let table = self.to_table();
        let mut problems: Vec<String> = table
            .mixed_routes()
            .into_iter()
            .map(|key| format!("Route {}: can't mix HTTP methods w/ other handlers", key))
            .collect();

        for (shadowed, by) in table.shadowed_routes() {
            let routes = table.routes();
            problems.push(format!(
                "Route {}: unreachable, every URL it matches is taken by earlier route {}",
                routes[shadowed].key, routes[by].key
            ));
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ROUTES: &str = r#"
settings:
  debug: true
routes:
  - match: /auth
    name: login token
    respond:
      token: xyz
      x-token: sce
  - match: /some/route
    respond:
      GET:
        result:
          key: GET
      POST:
        result:
          key: POST
  - match: /hello
    respond: hello
"#;

    #[test]
    fn test_parse_route_file() {
        let file = RouteFile::from_yaml(ROUTES).unwrap();
        assert!(file.settings.debug);
        assert!(file.settings.log_matches);
        assert_eq!(file.routes.len(), 3);
        assert_eq!(file.routes[0].key, "/auth");
        assert_eq!(file.routes[0].name.as_deref(), Some("login token"));
        assert!(file.validate().is_ok());

        let kinds: Vec<_> = file.to_table().routes().iter().map(|r| r.rule.kind()).collect();
        assert_eq!(kinds, ["fixture", "method_table", "fixture"]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
routes:
  - match: /x
    respond: 1
    priority: 10
"#;
        assert!(RouteFile::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validate_reports_mixed_and_shadowed() {
        let yaml = r#"
routes:
  - match: /api
    respond: broad
  - match: /api/users
    respond: never
  - match: /mixed
    respond:
      GOT: {}
      POST: {}
"#;
        let file = RouteFile::from_yaml(yaml).unwrap();
        let err = file.validate().unwrap_err().to_string();
        assert!(err.contains("Route /mixed"));
        assert!(err.contains("Route /api/users: unreachable"));
    }

    #[tokio::test]
    async fn test_from_file_keeps_mixed_routes_lazy() {
        let yaml = r#"
routes:
  - match: /mixed
    respond:
      GOT: {}
      POST: {}
  - match: /ok
    respond: [1, 2, 3]
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let server = RouteFile::from_file(file.path()).unwrap().into_server();
        let response = server
            .fetch("/ok", crate::RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(response.json::<Vec<u32>>().await.unwrap(), vec![1, 2, 3]);

        assert!(matches!(
            server.fetch("/mixed", crate::RequestOptions::get()).await,
            Err(crate::FetchError::MixedHandlerConfiguration)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(RouteFile::from_file(Path::new("/nonexistent/routes.yaml")).is_err());
    }
}
