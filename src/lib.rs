//! Fetch Stub Server
//!
//! Answers fetch calls made during tests with canned, route-matched
//! responses instead of real network I/O.
//!
//! # Features
//!
//! - **Substring Routes**: The first route whose key appears in the URL wins
//! - **Fixtures**: Return fixed JSON values for every method
//! - **Method Tables**: GET fixtures plus callbacks for POST, PATCH, PUT, DELETE
//! - **Callbacks**: Compute responses from the URL and the parsed request body
//! - **Async Replies**: Callbacks may hand back pending responses
//! - **Diagnostics**: Trace each call's params and response in debug mode
//! - **Install/Uninstall**: Swap the process-wide fetch stub, or inject it directly
//!
//! # Example
//!
//! ```
//! use fetch_stub_server::{FetchServer, Handler, RequestOptions, RouteTable, ServerConfig};
//! use serde_json::{json, Value};
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::new()
//!     .route("/foo.json", json!("bar"))
//!     .route("/baz/quux", Handler::callback(|_url, params: &Value| {
//!         json!(if params.get("foo").is_some() { "a" } else { "z" })
//!     }));
//! let server = FetchServer::new(routes, ServerConfig::default().with_debug(true));
//!
//! let response = server.fetch("https://myserver/foo.json", RequestOptions::get()).await?;
//! assert_eq!(response.json::<String>().await?, "bar");
//! # Ok::<(), fetch_stub_server::FetchError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod install;
pub mod matcher;
pub mod response;
pub mod server;

pub use config::{RouteFile, ServerConfig};
pub use error::{FetchError, Result};
pub use handler::{Callback, Entry, Handler, HandlerObject, Method, Reply, ResponseFuture};
pub use install::{fetch, Fetch, InstallGuard};
pub use matcher::{Rule, RouteTable};
pub use response::FetchResponse;
pub use server::{FetchServer, RequestOptions};
