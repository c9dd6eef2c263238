use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use vetclinic_assistant::cli::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    vetclinic_assistant::run(args).await
}
