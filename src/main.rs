use bidwatch::cli;
use bidwatch::error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    cli::Cli::run().await
}
