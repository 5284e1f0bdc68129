use clap::Parser;

use optseq::cmd::{Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Optimize(args) => args.run(),
        Commands::Show(args) => args.run(),
    }
}
