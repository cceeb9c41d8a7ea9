//! envsecrets CLI application

use envsecrets::cli::{self, CliError, Commands, EXIT_OK, exit_code_for, render_error};
use envsecrets::commands;
use envsecrets::tracing::{TracingConfig, init_tracing};
use std::io::Write;

fn main() {
    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: cli.log_filter,
    };
    if let Err(e) = init_tracing(tracing_config) {
        // Tracing is not available yet, report straight to stderr
        let _ = writeln!(std::io::stderr(), "Warning: {e}");
    }

    // Only commands that reach the secret service pay for a runtime
    let result = if commands::requires_async_runtime(&cli.command) {
        run_with_tokio(cli.command, &cli.project)
    } else {
        commands::execute_sync(cli.command, &cli.project)
    };

    let exit_code = match result {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

/// Create a tokio runtime and run `command` on it
fn run_with_tokio(command: Commands, project: &str) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::other(format!("Failed to create tokio runtime: {e}")))?;
    runtime.block_on(commands::execute_async(command, project))
}
