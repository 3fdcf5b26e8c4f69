use clap::Parser;

use localqa_cli::args::Args;
use localqa_cli::{commands, logging};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(args.log_level());
    if let Err(e) = commands::run(args).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
