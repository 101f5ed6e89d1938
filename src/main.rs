use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use servicenow_mcp::{Config, McpServer, McpSession};

/// MCP server exposing ServiceNow incident records over stdio.
#[derive(Parser)]
#[command(name = "servicenow-mcp", version)]
#[command(about = "MCP server for ServiceNow incident records", long_about = None)]
struct Cli {
    /// Base URL of the default instance, e.g. https://dev1234.service-now.com
    #[arg(long, env = "SERVICENOW_INSTANCE_URL")]
    instance_url: Option<String>,

    /// Basic-auth user for the default instance
    #[arg(long, env = "SERVICENOW_USERNAME")]
    username: Option<String>,

    /// Basic-auth password for the default instance
    #[arg(long, env = "SERVICENOW_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Bearer token for the default instance; takes precedence over basic auth
    #[arg(long, env = "SERVICENOW_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Instance used when a tool call names none (dev, test or prod)
    #[arg(long, env = "SERVICENOW_DEFAULT_INSTANCE")]
    default_instance: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "SERVICENOW_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Refuse create, update and delete calls
    #[arg(long, env = "SERVICENOW_READ_ONLY", default_value = "false")]
    read_only: bool,
}

impl Cli {
    /// Command-line values shadow the environment variables of the same name.
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "SERVICENOW_INSTANCE_URL" => self.instance_url.clone(),
            "SERVICENOW_USERNAME" => self.username.clone(),
            "SERVICENOW_PASSWORD" => self.password.clone(),
            "SERVICENOW_API_TOKEN" => self.api_token.clone(),
            "SERVICENOW_DEFAULT_INSTANCE" => self.default_instance.clone(),
            "SERVICENOW_TIMEOUT_SECS" => self.timeout_secs.map(|s| s.to_string()),
            other => std::env::var(other).ok(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "servicenow_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match Config::from_lookup(|name| cli.lookup(name)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    config.read_only = cli.read_only;

    let session = match McpSession::from_config(&config) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to start session");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        default_instance = %session.default_instance(),
        read_only = session.is_read_only(),
        "starting ServiceNow MCP server"
    );

    match McpServer::new(session).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}
