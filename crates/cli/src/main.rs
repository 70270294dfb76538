use clap::{Parser, Subcommand};
use lib::channels::{ChatSession, TelegramChannel};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "newsrelay")]
#[command(about = "Bridge between a chat group and the stock news backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: NEWSRELAY_CONFIG_PATH or ~/.newsrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the bridge: chat commands to the backend, and the HTTP relay into the group.
    Run {
        /// Config file path (default: NEWSRELAY_CONFIG_PATH or ~/.newsrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Relay HTTP port (default from config or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Post a message to a running relay, which forwards it into the group.
    Send {
        /// Config file path (default: NEWSRELAY_CONFIG_PATH or ~/.newsrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Text to send.
        #[arg(long, short)]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("newsrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_bridge(config, port).await {
                log::error!("bridge failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send { config, message }) => {
            if let Err(e) = run_send(config, message).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_bridge(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.relay.port = p;
    }
    log::info!("using config {}", path.display());
    let token = lib::config::resolve_telegram_token(&config);
    if token.is_none() {
        anyhow::bail!(
            "telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_BOT_TOKEN)"
        );
    }
    let session: Arc<dyn ChatSession> = Arc::new(TelegramChannel::new(token));
    lib::bridge::run_bridge(config, session).await
}

async fn run_send(config_path: Option<std::path::PathBuf>, message: String) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let url = format!("{}/send-message", lib::config::relay_base_url(&config.relay));
    let res = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "message": message }))
        .send()
        .await?;
    let status = res.status();
    let body: serde_json::Value = res.json().await.unwrap_or_default();
    if !status.is_success() {
        let err = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("relay request failed");
        anyhow::bail!("{} ({})", err, status);
    }
    println!(
        "{}",
        body.get("status").and_then(|v| v.as_str()).unwrap_or("ok")
    );
    Ok(())
}
