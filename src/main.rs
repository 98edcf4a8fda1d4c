use clap::Parser;
use trackgpx::cli::{print_error, print_info, Cli};
use trackgpx::utils::{get_log_dir, get_log_path};
use trackgpx::ApiError;

fn main() {
    let cli = Cli::parse();

    // Set up logging directory
    let log_dir = get_log_dir();
    let guard = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

            let file_appender = tracing_appender::rolling::never(&log_dir, "trackgpx.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(non_blocking)
                .with_ansi(false) // Disable ANSI colors in file
                .init();
            Some(guard)
        }
        Err(e) => {
            eprintln!("Logging disabled: cannot create {:?}: {}", log_dir, e);
            None
        }
    };

    let result = cli.execute();

    if let Err(e) = result {
        tracing::error!("Command failed: {:#}", e);
        print_error(&e.to_string());
        if e
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_unauthorized)
        {
            print_info("Your session has expired. Run 'trackgpx login' again.");
        }
        if guard.is_some() {
            eprintln!("Details: {}", get_log_path().display());
        }
        drop(guard);
        std::process::exit(1);
    }

    // Flush buffered log lines before exit
    drop(guard);
}
