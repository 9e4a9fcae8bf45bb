use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use wxday_core::{AppError, Config, ConfigError, ConfigOverrides};
use wxday_weather::{
    evict_dates, DateNormalizer, EvictOutcome, FileDateSource, Location, WeatherCache,
    WeatherOrchestrator, WeatherProvider,
};

/// Historical daily weather for a list of free-form dates.
#[derive(Parser)]
#[command(name = "wxday", version)]
struct Cli {
    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Process the input file and print the batch summary as JSON.
    Run(RunArgs),
    /// Remove cached entries for the given dates.
    Evict {
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[arg(required = true)]
        dates: Vec<String>,
    },
    /// Validate the configuration and report problems.
    CheckConfig,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Date list, one entry per line. Overrides `input_file`.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Overrides `cache_dir`.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config, AppError> {
    Config::load_validated(path, overrides)
        .map(|(config, _)| config)
        .map_err(|e| match e.downcast::<ConfigError>() {
            Ok(config_err) => AppError::Config(config_err),
            Err(other) => AppError::Other(other),
        })
}

async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<(), AppError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            input_file: args.input,
            cache_dir: args.cache_dir,
        },
    )?;

    let provider = WeatherProvider::new(&config.weather)?;
    let orchestrator = WeatherOrchestrator::new(
        provider,
        WeatherCache::new(&config.cache_dir),
        Location::from(&config.weather),
    );

    let summary = orchestrator
        .run(&FileDateSource::new(&config.input_file))
        .await
        .map_err(|e| AppError::Weather(e.to_string()))?;

    let json = if args.compact {
        serde_json::to_string(&summary)
    } else {
        serde_json::to_string_pretty(&summary)
    }
    .map_err(|e| AppError::Other(e.into()))?;

    println!("{}", json);
    Ok(())
}

fn evict(
    config_path: Option<&Path>,
    cache_dir: Option<PathBuf>,
    dates: &[String],
) -> Result<(), AppError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            input_file: None,
            cache_dir,
        },
    )?;
    let cache = WeatherCache::new(&config.cache_dir);

    let outcomes = evict_dates(&cache, &DateNormalizer::new(), dates)
        .map_err(|e| AppError::Weather(e.to_string()))?;
    for (_, outcome) in outcomes {
        match outcome {
            EvictOutcome::Removed(path) => println!("removed  {}", path.display()),
            EvictOutcome::Absent(key) => println!("absent   {}", key),
            EvictOutcome::Skipped(e) => println!("skipped  {}", e),
        }
    }

    Ok(())
}

fn check_config(config_path: Option<&Path>) -> Result<(), AppError> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let validation = config.validate();

    for warning in &validation.warnings {
        println!("warning: {}", warning);
    }
    if validation.is_valid() {
        println!("Configuration is valid");
        Ok(())
    } else {
        for error in &validation.errors {
            println!("error: {}", error);
        }
        Err(ConfigError::Invalid(validation.error_summary()).into())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = wxday_core::init() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let outcome = match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(config_path, args).await,
        Command::Evict { cache_dir, dates } => evict(config_path, cache_dir, &dates),
        Command::CheckConfig => check_config(config_path),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
