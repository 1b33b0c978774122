#[tokio::main]
async fn main() -> std::io::Result<()> {
    match_client::run_with_config().await
}
