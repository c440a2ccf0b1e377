use clap::Parser;

use sstv_studio::cli::{self, Args};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !cli::run(args) {
        std::process::exit(1);
    }
}
