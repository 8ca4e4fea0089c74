use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io;

use ado_mobile::{
    AdoMobileError, AppContext, Args, AzureDevOpsClient, Config,
    core::{ExitCode, error_message, output::OutputWriter, runner::CommandRunner},
    logging::{init_logging, parse_early_log_config},
    preferences::{FileStore, WorkspaceDefaults},
};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Logging comes up before clap so argument handling can be traced
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = init_logging(parse_early_log_config(&raw_args));

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            eprintln!("Error: {}", error_message(&err));
            let code = err
                .downcast_ref::<AdoMobileError>()
                .map(ExitCode::from_error)
                .unwrap_or(ExitCode::GeneralError);
            tracing::debug!(code = code.code(), "Exiting with error");
            code.into()
        }
    }
}

async fn run(args: Args) -> Result<()> {
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Sample config file: {}", path.display());
        return Ok(());
    }

    let Some(command) = args.command.clone() else {
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    // Resolve configuration from CLI args, environment variables, and config file.
    // Stored and compiled-in values are layered underneath by the runner.
    let file_layer = Config::load_from_file().map_err(AdoMobileError::from)?;
    let overrides = file_layer
        .merge(Config::load_from_env())
        .merge(Config::from_args(&args));
    let format = Config::default().merge(overrides.clone()).output_format();

    let store = FileStore::open_default()
        .map_err(AdoMobileError::from)
        .context("Failed to locate the preference store")?;
    let context = AppContext::load(store, WorkspaceDefaults::compiled());
    let client = AzureDevOpsClient::new().map_err(AdoMobileError::from)?;

    let mut runner = CommandRunner::new(
        context,
        client,
        overrides,
        OutputWriter::new(io::stdout(), format),
    );
    runner.run(command).await?;
    Ok(())
}
