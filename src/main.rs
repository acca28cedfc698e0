//! Fetch Stub Server - CLI Entry Point
//!
//! Loads a route file and answers a single request against it.

use anyhow::{Context, Result};
use clap::Parser;
use fetch_stub_server::{RequestOptions, RouteFile};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "fetch-stub-server",
    about = "Resolve fetch calls against a route file of canned responses",
    version
)]
struct Args {
    /// Path to route file
    #[arg(short, long, default_value = "routes.yaml")]
    routes: PathBuf,

    /// Request URL
    #[arg(short, long)]
    url: Option<String>,

    /// HTTP method (defaults to GET)
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request body
    #[arg(short, long)]
    body: Option<String>,

    /// Trace the call's params and response
    #[arg(short, long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print an example route file and exit
    #[arg(long)]
    print_config: bool,

    /// Validate route file and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        println!("{}", include_str!("../demos/routes.yaml"));
        return Ok(());
    }

    let mut file = if args.routes.exists() {
        info!(path = ?args.routes, "Loading routes");
        RouteFile::from_file(&args.routes)?
    } else if args.validate {
        anyhow::bail!("Route file not found: {:?}", args.routes);
    } else {
        info!("Using empty route table (no route file)");
        RouteFile::default()
    };

    if args.validate {
        file.validate()?;
        println!("Route file is valid ({} routes defined)", file.routes.len());
        return Ok(());
    }

    if args.debug {
        file.settings.debug = true;
    }

    let url = args.url.context("--url is required unless --validate or --print-config is given")?;
    let server = file.into_server();

    let options = RequestOptions {
        method: args.method,
        body: args.body,
        ..Default::default()
    };

    let response = server.fetch(&url, options).await?;
    println!("{} {}", response.status(), response.content_type());

    let raw = response.bytes().await;
    match serde_json::from_slice::<serde_json::Value>(&raw) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", String::from_utf8_lossy(&raw)),
    }

    Ok(())
}
