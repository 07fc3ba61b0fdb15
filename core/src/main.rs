use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokensale_core::config::load_config;
use tokensale_core::purchase::PurchaseRequest;
use tokensale_core::reporter::ErrorReporter;
use tokensale_core::session::SaleSession;
use tokensale_core::{api, estimate_sel_str};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: tokensale [allowance | approve | order <amount> <address> | estimate <amount>]";

#[tokio::main]
async fn main() -> ExitCode {
    // -------------------------------
    // Load configuration
    // -------------------------------
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // -------------------------------
    // Initialize Tracing / Logging
    // -------------------------------
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Token sale starting...");
    tracing::info!("Loaded config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    // -------------------------------
    // CLI Argument Handling
    // -------------------------------
    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    if let ["estimate", amount] = args.as_slice() {
        return match estimate_sel_str(amount, config.sel_price_usdt) {
            Ok(estimate) => {
                println!("{estimate} SEL");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", ErrorReporter::report(&e));
                ExitCode::FAILURE
            }
        };
    }

    let session = match SaleSession::from_config(&config) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            tracing::error!("Failed to open sale session: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.as_slice() {
        [] => {}
        ["allowance"] => {
            return match session.refresh_allowance().await {
                Ok(record) => {
                    println!("{}", serde_json::json!(record));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", ErrorReporter::report(&e));
                    ExitCode::FAILURE
                }
            };
        }
        ["approve"] => {
            let outcome = session.approve().await;
            println!("{}", SaleSession::message(&outcome));
            return exit_for(outcome.is_done());
        }
        ["order", amount, address] => {
            if let Err(e) = session.start().await {
                eprintln!("{}", ErrorReporter::report(&e));
                return ExitCode::FAILURE;
            }
            let outcome = session
                .handle_order(&PurchaseRequest::new(*amount, *address))
                .await;
            println!("{}", SaleSession::message(&outcome));
            if let Some(transfer) = &outcome.transfer {
                println!(
                    "Transfer sent to {} with hash {}",
                    transfer.dest, transfer.extrinsic_hash
                );
            }
            return exit_for(outcome.is_done());
        }
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    }

    // -------------------------------
    // Web Server Setup
    // -------------------------------
    let wallet = session.state().await.wallet;
    tracing::info!(wallet, "Starting token sale API server...");
    if let Err(e) = session.start().await {
        tracing::error!("Failed to start sale session: {e}");
        return ExitCode::FAILURE;
    }

    let app = api::router(session);

    // -------------------------------
    // Run Server
    // -------------------------------
    let bind_addr = format!("0.0.0.0:{}", config.server_port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Server listening on http://{bind_addr}");
    tracing::info!("Swagger UI available at http://{bind_addr}/swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn exit_for(done: bool) -> ExitCode {
    if done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
