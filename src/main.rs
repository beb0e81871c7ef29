use clap::Parser;
use page_table_sim::config::Config;
use page_table_sim::run_simulation;
use std::process::ExitCode;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn main() -> ExitCode {
    init_logging();
    let config = Config::parse();
    config.display();
    match run_simulation(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}
