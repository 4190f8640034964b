use clap::Parser;
use flowlink::adapter::inbound::cli::command::Cli;
use flowlink::adapter::inbound::cli::{output, run};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run::execute(cli).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
