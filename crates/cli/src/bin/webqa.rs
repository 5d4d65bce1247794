use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    webqa_cli::main_entry().await
}
