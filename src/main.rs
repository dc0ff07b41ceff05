use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ticketserver::config::AppConfig;
use ticketserver::llm::gateway::AiGateway;
use ticketserver::shared::state::AppState;
use ticketserver::shared::utils::{create_conn, run_migrations};
use ticketserver::{bootstrap, cli, llm, tickets};

fn parse_count(args: &[String]) -> usize {
    args.iter()
        .position(|a| a == "--count")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(8)
}

fn print_usage() {
    eprintln!("Usage: ticketserver [seed [--count N] | clear]");
    eprintln!("With no command, runs the HTTP server.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketserver=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database_url)?;
    run_migrations(&pool)?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "seed" => {
                cli::seed(&pool, parse_count(&args))?;
                return Ok(());
            }
            "clear" => {
                cli::clear(&pool)?;
                return Ok(());
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {other}");
                print_usage();
                anyhow::bail!("unknown command: {other}");
            }
        }
    }

    bootstrap::ensure_default_admin(&pool, &config.admin)?;

    let ai = AiGateway::from_config(&config.ai);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        conn: pool,
        config,
        ai,
    });

    let app = Router::new()
        .merge(tickets::configure_tickets_routes())
        .merge(llm::configure_ai_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
