// schemachat/crates/schemachat/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use schemachat::{config::Config, run_server, telemetry};

/// Conversational SQL schema designer
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "schemachat", version, about)]
struct Args {
    /// Listen host, overrides API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides API_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Store connection string, overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init_tracing();

    let mut cfg = Config::from_env()?;
    if let Some(host) = args.host {
        cfg.api_host = host;
    }
    if let Some(port) = args.port {
        cfg.api_port = port;
    }
    if let Some(database_url) = args.database_url {
        cfg.database_url = database_url;
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
