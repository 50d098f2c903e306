//! tuyagw - talk to Tuya cloud devices from the command line.
//!
//! Credentials come from `TUYA_REGION`, `TUYA_CLIENT_ID` and
//! `TUYA_CLIENT_SECRET` (or the keychain, see `store-secret`). A `.env` file in
//! the working directory is honoured.

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tuyagw_core::api::{Command, IrKey};
use tuyagw_core::auth::{SecretStore, TokenStatus};
use tuyagw_core::{Config, DeviceClient};

#[derive(Parser)]
#[command(name = "tuyagw", version, about = "Signed requests against the Tuya cloud OpenAPI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Cloud(CloudCommand),
    #[command(flatten)]
    Secret(SecretCommand),
}

/// Commands that talk to the Tuya cloud.
#[derive(Subcommand)]
enum CloudCommand {
    /// Make sure a valid token is held and show its status
    Token,
    /// List the functions a device supports
    Functions { device_id: String },
    /// Show the current status of a device
    Status { device_id: String },
    /// Send one command, e.g. `command <id> bright_value 125`
    Command {
        device_id: String,
        code: String,
        /// JSON value; bare words are sent as strings
        value: String,
    },
    /// Trigger a home scene
    Scene { home_id: String, scene_id: String },
    /// Press a key on an infrared remote
    Ir {
        infrared_id: String,
        remote_id: String,
        key: String,
        #[arg(long)]
        category_id: Option<i64>,
    },
}

/// Keychain maintenance. Needs only the client id, never a connection.
#[derive(Subcommand)]
enum SecretCommand {
    /// Save the client secret for TUYA_CLIENT_ID in the OS keychain
    StoreSecret,
    /// Remove the client secret for TUYA_CLIENT_ID from the OS keychain
    ForgetSecret,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Parse a command value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;

    let command = match cli.command {
        Commands::Secret(command) => return manage_secret(&config, command),
        Commands::Cloud(command) => command,
    };

    let credentials = config.credentials_from_env()?;
    let client = tuyagw_core::connect(&config, credentials).context("Failed to build HTTP client")?;
    info!(region = %client.store().credentials().region, "tuyagw starting");

    run(&client, command).await
}

fn manage_secret(config: &Config, command: SecretCommand) -> Result<()> {
    let client_id = config.client_id()?;
    match command {
        SecretCommand::StoreSecret => {
            let secret =
                rpassword::prompt_password(format!("Client secret for {}: ", client_id))?;
            SecretStore::store(client_id, secret.trim())
                .context("Failed to store secret in keychain")?;
            eprintln!("Stored client secret for {}", client_id);
        }
        SecretCommand::ForgetSecret => {
            SecretStore::delete(client_id).context("Failed to delete secret from keychain")?;
            eprintln!("Removed client secret for {}", client_id);
        }
    }
    Ok(())
}

async fn run(client: &DeviceClient, command: CloudCommand) -> Result<()> {
    match command {
        CloudCommand::Token => {
            client.store().ensure_valid().await?;
            match client.store().status().await {
                TokenStatus::Valid { remaining_secs } => {
                    println!("token valid for {}s", remaining_secs)
                }
                other => println!("{:?}", other),
            }
            println!(
                "cached at {}",
                client.store().token_file().path().display()
            );
        }
        CloudCommand::Functions { device_id } => {
            print_json(&client.device_functions(&device_id).await?)?;
        }
        CloudCommand::Status { device_id } => {
            print_json(&client.device_status(&device_id).await?)?;
        }
        CloudCommand::Command {
            device_id,
            code,
            value,
        } => {
            let commands = [Command::new(code, parse_value(&value))];
            print_json(&client.send_commands(&device_id, &commands).await?)?;
        }
        CloudCommand::Scene { home_id, scene_id } => {
            print_json(&client.trigger_scene(&home_id, &scene_id).await?)?;
        }
        CloudCommand::Ir {
            infrared_id,
            remote_id,
            key,
            category_id,
        } => {
            let key = IrKey {
                category_id,
                key: Some(key),
                key_id: None,
            };
            print_json(&client.send_ir_key(&infrared_id, &remote_id, &key).await?)?;
        }
    }
    Ok(())
}
