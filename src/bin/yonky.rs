use clap::Parser;
use tracing::{error, info};
use yonky::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing with environment-based filtering
    let default_level = if cli.verbose && !cli.quiet { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting yonky {}", yonky::cli::VERSION);

    // Execute command with user-friendly error handling
    if let Err(e) = cli.execute().await {
        let code = e.exit_code();
        if code == 0 {
            // Declined confirmation, not a failure
            eprintln!("{}", e.user_message());
            return Ok(());
        }

        // Log the full error for debugging
        error!("Command execution failed: {:?}", e);

        // Display user-friendly error message
        eprintln!("Error: {}", e.user_message());

        std::process::exit(code);
    }

    info!("Command completed successfully");
    Ok(())
}
