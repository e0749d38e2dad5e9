use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{mount, select_view, GraphQlPostsExecutor};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8911")]
    server_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let executor = GraphQlPostsExecutor::new(Client::new(), &args.server_url)?;
    info!(endpoint = %executor.endpoint(), "fetching posts");
    let handle = mount(Arc::new(executor));
    let mut states = handle.subscribe();
    println!("{}", select_view(&states.borrow_and_update()));

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                println!("{}", select_view(&state));
                if state.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; tearing down fetch");
                handle.teardown();
                return Ok(());
            }
        }
    }

    Ok(())
}
