mod configuration;
mod error;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proteus::content_filter::ContentFilter;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::configuration::Settings;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about = "Agent gateway for local models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Overrides PROTEUS_SERVER__HOST
        #[arg(long)]
        host: Option<String>,

        /// Overrides PROTEUS_SERVER__PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one message through the agent and print the answer
    Ask {
        #[arg(long)]
        conversation_id: Option<String>,

        /// Strip markdown emphasis from the answer
        #[arg(long)]
        plain: bool,

        #[arg(required = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Missing settings fail here, before anything binds or connects
    let mut settings = Settings::new()?;
    let state = AppState::from_settings(&settings).context("failed to create service clients")?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(&settings, state).await
        }
        Command::Ask {
            conversation_id,
            plain,
            message,
        } => {
            let conversation_id = routes::chat::conversation_id(conversation_id.as_deref());
            let result = state
                .orchestrator
                .run(message.join(" "), conversation_id)
                .await?;

            let response = result.final_response.unwrap_or_default();
            if plain {
                println!("{}", ContentFilter::markup_strip().apply(&response));
            } else {
                println!("{}", response);
            }
            Ok(())
        }
    }
}

async fn serve(settings: &Settings, state: AppState) -> Result<()> {
    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
