use clap::Parser as _;
use tracing_subscriber::{fmt, EnvFilter};

use genomizer_deploy::cli::Cli;
use genomizer_deploy::context::Verbosity;

fn init_logging(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flag(cli.verbose));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("fatal: failed to start async runtime: {e}");
            std::process::exit(-1);
        }
    };

    if let Err(e) = runtime.block_on(genomizer_deploy::run(cli)) {
        log::debug!("{e:?}");
        eprintln!("fatal: [{}] {}", e.kind().code(), e);
        std::process::exit(-1);
    }
}
