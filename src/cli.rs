/*
 * Responsibility
 * - Command surface: serve (default) and operator key bootstrap
 */
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::ENV_JWT_HS256_KEY;

const SECRET_BYTE_LENGTH: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "ets-gateway", version, about = "Ephemeral Token Service gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway HTTP server
    Serve,
    /// Generate an HS256 signing key for token issuance
    GenerateJwtKey,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None | Some(Command::Serve) => crate::app::run().await,
        Some(Command::GenerateJwtKey) => generate_jwt_key(),
    }
}

fn generate_jwt_key() -> Result<()> {
    let mut secret = [0u8; SECRET_BYTE_LENGTH];
    OsRng
        .try_fill_bytes(&mut secret)
        .context("read random bytes")?;
    println!("{}={}", ENV_JWT_HS256_KEY, hex::encode(secret));
    Ok(())
}
