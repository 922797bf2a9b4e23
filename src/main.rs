use clap::Parser;
use nclimgrid_zip::cli::{run, Cli};
use nclimgrid_zip::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
