use std::env;
use std::path::PathBuf;

use anyhow::anyhow;

use vocalis::{synthesize_to_file, Config, IdentityClient, TelegramDelivery};

const USAGE: &str = "usage: vocalis [--config <path>] [--output <path>] <text>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments: one required positional (the text to synthesize)
    // plus optional --config and --output overrides.
    let mut args = env::args();
    let _ = args.next();

    let mut text: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--output" => {
                let path = args.next().ok_or_else(|| anyhow!("--output requires a file path"))?;
                output_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                anyhow::bail!("Unknown option '{flag}'. {USAGE}");
            }
            positional => {
                if text.is_some() {
                    anyhow::bail!("Unexpected argument '{positional}'. {USAGE}");
                }
                text = Some(positional.to_string());
            }
        }
    }

    let text = text.ok_or_else(|| anyhow!("{USAGE}"))?;

    // Load configuration (env overrides file values)
    let mut config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };
    if let Some(path) = output_path {
        config.output_path = path;
    }

    let identity = IdentityClient::new(&config.sso)?;

    let outcome = match synthesize_to_file(&config, &identity, &text).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Surface the captured correlation ids, if any, before bailing:
            // they are what the service's operators will ask for.
            if let Some(metadata) = e.response_metadata() {
                eprintln!(
                    "session failed (request_id={}, trace_id={})",
                    metadata.request_id.as_deref().unwrap_or("-"),
                    metadata.trace_id.as_deref().unwrap_or("-"),
                );
            }
            return Err(e.into());
        }
    };

    println!(
        "Saved synthesized audio to {} ({} bytes, trace id {})",
        outcome.file.path.display(),
        outcome.file.payload_bytes,
        outcome.trace_id,
    );

    if let Some(delivery_config) = &config.delivery {
        let delivery = TelegramDelivery::new(delivery_config)?;
        delivery.send_audio(&outcome.file.path).await?;
        println!("Delivered audio to chat {}", delivery_config.chat_id);
    }

    Ok(())
}
