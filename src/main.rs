//! zarr-export command line entry point
//!
//! Connects to the repository gateway, resolves the managed-storage and
//! converter locations once, runs the export over the selection and prints
//! the accumulated report on stdout. Logs go to stderr.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zarr_export::{
    Bioformats2Raw, Config, ConversionRunner, DataType, Error, ExportOrchestrator, ExportPaths,
    HttpRepository, Repository, Selection,
};

/// Convert images to Zarr and attach them as file annotations
///
/// Conversion has no timeout: a converter that hangs stalls the whole batch.
#[derive(Parser, Debug)]
#[command(name = "zarr-export", version, about, long_about = None)]
struct Cli {
    /// The kind of objects the ids refer to ("Dataset" or "Image")
    #[arg(long, default_value = "Image")]
    data_type: DataType,

    /// Object ids, comma separated or repeated
    #[arg(
        long,
        required = true,
        num_args = 1..,
        value_delimiter = ',',
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    ids: Vec<i64>,

    /// JSON configuration file
    #[arg(long, env = "ZARR_EXPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Repository gateway URL (overrides the config file)
    #[arg(long, env = "ZARR_EXPORT_URL")]
    url: Option<String>,

    /// Session key (overrides the config file)
    #[arg(long, env = "ZARR_EXPORT_SESSION_KEY", hide_env_values = true)]
    session_key: Option<String>,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("zarr_export=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> zarr_export::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(url) = &cli.url {
        config.repository.base_url = url.clone();
    }
    if let Some(key) = &cli.session_key {
        config.repository.session_key = Some(key.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> zarr_export::Result<String> {
    let config = load_config(&cli)?;
    let repository: Arc<dyn Repository> = Arc::new(HttpRepository::new(&config.repository)?);

    let paths = ExportPaths::resolve(&config.paths, repository.as_ref()).await?;
    let converter = Bioformats2Raw::new(
        &paths.converter_dir,
        &config.converter.binary,
        config.converter.success_policy,
    );
    let runner = ConversionRunner::new(paths, Arc::new(converter));
    let orchestrator = ExportOrchestrator::new(repository, runner, config.temp_dir());

    let selection = Selection {
        data_type: cli.data_type,
        ids: cli.ids,
    };
    let report = orchestrator.run(&selection).await?;
    Ok(report.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let started = Instant::now();

    let result = run(cli).await;
    info!(duration = ?started.elapsed(), "run complete");

    match result {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(Error::EmptySelection { message }) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "export aborted");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_dataset_selection() {
        let cli = Cli::try_parse_from(["zarr-export", "--data-type", "Dataset", "--ids", "3,4"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cli.data_type, DataType::Dataset);
        assert_eq!(cli.ids, vec![3, 4]);
    }

    #[test]
    fn test_rejects_non_positive_ids_and_unknown_types() {
        assert!(Cli::try_parse_from(["zarr-export", "--ids", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["zarr-export", "--data-type", "Project", "--ids", "1"]).is_err()
        );
        assert!(Cli::try_parse_from(["zarr-export"]).is_err());
    }
}
