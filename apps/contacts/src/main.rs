use anyhow::{Context, Result};
use clap::Parser;
use contacts_service::config::{self, Config, LogFormat, StoreDriver};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contacts-service")]
#[command(about = "Server-rendered contact manager")]
struct Args {
    /// Listen address. Overrides CONTACTS_BIND_ADDR.
    #[arg(long)]
    bind_addr: Option<String>,
    /// Contact store: `session` or `postgres`. Overrides CONTACTS_STORE_DRIVER.
    #[arg(long)]
    store: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env().context("load contacts config")?;
    if let Some(bind_addr) = args.bind_addr.as_deref() {
        config.bind_addr = config::parse_bind_addr(bind_addr)?;
    }
    if let Some(store) = args.store.as_deref() {
        config.store_driver = StoreDriver::parse(store)?;
        config.validate()?;
    }

    init_tracing(&config);
    contacts_service::serve(config).await
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
