use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    txtpost::cli::run().await
}
