#[tokio::main]
async fn main() -> anyhow::Result<()> {
    callboard::run().await
}
