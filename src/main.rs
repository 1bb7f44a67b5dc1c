use clap::Parser;
use m1bridge::cli::Cli;
use m1bridge::{init_logging, relay};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    relay::run(cli)
}
