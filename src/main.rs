use anyhow::Result;
use std::process;
use log::error;
use sentry_plugins::plugin::PluginError;
use sentry_plugins::{app, cli, logging};

fn main() {
    // Set up panic handler with better error reporting
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {:?}", panic_info);
        eprintln!("Panic: {:?}", panic_info);
        process::exit(101);
    }));

    if let Err(e) = run() {
        // Plugin errors meant for users are shown without logging noise
        let is_user_error = e.chain().any(|cause| {
            cause
                .downcast_ref::<PluginError>()
                .map_or(false, |err| err.is_user_facing() || err.is_registry_error())
        });

        if is_user_error {
            eprintln!("{:#}", e);
        } else {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
        }

        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::args::parse_args();

    cli::args::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let registries = app::build_registries(&config_manager)?;

    // Hooks are awaited one at a time, so a single-threaded runtime suffices
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let output = runtime.block_on(app::execute(&args.command, &registries))?;
    print!("{}", output);
    Ok(())
}
