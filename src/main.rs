use std::env;
use std::process;

use ivrank::cli;
use ivrank::logging::init_logging;

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    process::exit(cli::run_with_args(&args));
}
