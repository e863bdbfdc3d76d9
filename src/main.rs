/*
 * Responsibility
 * - tokio runtime entry; all logic lives in the library
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ets_gateway::cli::run().await
}
