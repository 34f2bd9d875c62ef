use anyhow::{Context, Result};
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::{
            session::local::LocalSessionManager,
            tower::{StreamableHttpServerConfig, StreamableHttpService},
        },
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use feedback_triage::TriageApp;
use feedback_triage::api::{build_router, with_bearer_auth};
use feedback_triage::config::Config;
use feedback_triage::service::FeedbackTriageService;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays free for the stdio MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());
    let app = TriageApp::new(Arc::clone(&config))?;
    let service = app.mcp_service();

    match config.server.transport.as_str() {
        "http" | "streamable_http" => {
            let bind: SocketAddr = config
                .http
                .bind
                .parse()
                .with_context(|| format!("Invalid http.bind {:?} (expected host:port)", config.http.bind))?;
            let path = config.http.mcp_path.clone();

            let svc_factory_service = service.clone();
            let http_service: StreamableHttpService<FeedbackTriageService, _> =
                StreamableHttpService::new(
                    move || Ok(svc_factory_service.clone()),
                    Arc::new(LocalSessionManager::default()),
                    StreamableHttpServerConfig {
                        stateful_mode: true,
                        sse_keep_alive: Some(Duration::from_secs(15)),
                    },
                );

            let router = build_router(app.app_state()).nest_service(path.as_str(), http_service);
            let router = with_bearer_auth(router, config.http.bearer_token.clone());

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(
                %bind,
                path = %path,
                auth = %config.http.bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
                "Starting HTTP API and Streamable HTTP MCP server"
            );

            axum::serve(listener, router).await?;
            Ok(())
        }
        _ => {
            tracing::info!("Starting MCP server on stdio transport");
            let server = service.serve(stdio()).await?;
            server.waiting().await?;
            tracing::info!("Server connection closed");
            Ok(())
        }
    }
}
