//! `webserv` entry point: CLI argument handling, logging init, and runtime
//! startup, using a minimalist positional `env::args()` parse (one optional
//! config path argument, no subcommands or flags).

use webserv::run;

fn main() {
    env_logger::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config/default.conf".to_string());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start tokio runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(&config_path)) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
