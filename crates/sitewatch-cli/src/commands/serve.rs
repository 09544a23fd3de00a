//! Runs the REST server: loads configuration, bootstraps a [`Core`], and
//! serves `sitewatch_api::build_router` over TCP until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use sitewatch_core::config::Config;
use sitewatch_engine::{Core, HttpRendererClient, RendererClient, UnconfiguredRendererClient};
use sitewatch_logging::{init, Profile};

use super::block_on;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Path to a `watch.toml` config file; falls back to built-in defaults
    /// and `WATCH_*` environment variables if absent.
    #[arg(long)]
    pub config: Option<String>,

    /// Address to bind the REST server to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Use JSON-structured logging output instead of the human-readable
    /// development format.
    #[arg(long)]
    pub production: bool,
}

pub fn execute(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init(if args.production {
        Profile::Production
    } else {
        Profile::Development
    });

    let config = Config::load_from(args.config.as_deref())?;
    let renderer = build_renderer(&config);
    let core = Core::bootstrap(config, renderer)?;
    let router = sitewatch_api::build_router(core);

    block_on(async move {
        let listener = tokio::net::TcpListener::bind(&args.addr).await?;
        tracing::info!(addr = %args.addr, "sitewatch listening");
        axum::serve(listener, router).await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn build_renderer(config: &Config) -> Arc<dyn RendererClient> {
    match &config.renderer_url {
        Some(url) => Arc::new(HttpRendererClient::new(
            url.clone(),
            config.renderer_token.clone(),
            Duration::from_secs(config.render_timeout),
        )),
        None => Arc::new(UnconfiguredRendererClient),
    }
}
