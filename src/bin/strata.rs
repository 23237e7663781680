//! strata - stratified BRFSS obesity analysis CLI
//!
//! Cleans the survey extract, runs the stratified comparisons and fits the
//! pooled income/education regression.

use brfss_strata::data::{clean_dataset, load_observations};
use brfss_strata::error::{Result, StrataError};
use brfss_strata::pipeline::{
    run_comparison, run_regression, Batch, BatchConfig, RegressionConfig, StrataConfig,
    CLEANED_DATA_FILE, RAW_DATA_FILE,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// How reports are printed to stdout
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable summaries
    Text,
    Json,
    Yaml,
}

/// Stratified obesity-rate comparisons over BRFSS survey extracts
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the input data and receiving every output
    #[arg(short, long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop records without an obesity rate
    Clean {
        /// Raw survey extract (defaults to the raw file inside --dir)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cleaned output CSV (defaults to the cleaned file inside --dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pivot one stratification category and test for differences
    Compare {
        /// Preset name: age, education, income, or gender
        preset: Option<String>,

        /// Comparison configuration YAML instead of a preset
        #[arg(short, long, conflicts_with = "preset")]
        config: Option<PathBuf>,

        /// Cleaned data CSV (defaults to the cleaned file inside --dir)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Skip the line chart
        #[arg(long)]
        no_chart: bool,
    },

    /// Fit the pooled interaction regression over the written tables
    Regress {
        /// Regression configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a batch from a YAML file, or every stage when none is given
    #[command(alias = "all")]
    Run {
        /// Batch configuration YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the standard batch configuration as YAML
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "strata.yaml")]
        output: PathBuf,
    },

    /// List the comparison presets
    Presets,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let dir = cli.dir.as_path();
    let format = cli.format;

    let result = match cli.command {
        Commands::Clean { input, output } => cmd_clean(dir, input, output, format),

        Commands::Compare {
            preset,
            config,
            data,
            no_chart,
        } => cmd_compare(dir, preset.as_deref(), config.as_deref(), data, no_chart, format),

        Commands::Regress { config } => cmd_regress(dir, config.as_deref(), format),

        Commands::Run { config } => cmd_run(dir, config.as_deref(), format),

        Commands::Example { output } => cmd_example(dir, &output),

        Commands::Presets => cmd_presets(format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print a report in the requested format.
fn emit<T: Serialize + Display>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => println!("{}", value),
    }
    Ok(())
}

fn cmd_clean(
    dir: &Path,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let input = input.unwrap_or_else(|| dir.join(RAW_DATA_FILE));
    let output = output.unwrap_or_else(|| dir.join(CLEANED_DATA_FILE));

    let summary = clean_dataset(&input, &output)?;
    eprintln!("Cleaned data written to {:?}", output);
    emit(&summary, format)
}

fn cmd_compare(
    dir: &Path,
    preset: Option<&str>,
    config: Option<&Path>,
    data: Option<PathBuf>,
    no_chart: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut strata = match (preset, config) {
        (_, Some(path)) => StrataConfig::from_yaml_file(path)?,
        (Some(name), None) => StrataConfig::preset(name)?,
        (None, None) => {
            return Err(StrataError::InvalidParameter(
                "give a preset name or --config".to_string(),
            ))
        }
    }
    .in_dir(dir);
    if no_chart {
        strata.output_chart = None;
    }

    let data = data.unwrap_or_else(|| dir.join(CLEANED_DATA_FILE));
    let observations = load_observations(&data)?;
    let report = run_comparison(&observations, &strata)?;
    emit(&report, format)
}

fn cmd_regress(dir: &Path, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = match config {
        Some(path) => RegressionConfig::from_yaml(&std::fs::read_to_string(path)?)?,
        None => RegressionConfig::default(),
    }
    .in_dir(dir);

    let report = run_regression(&config)?;
    emit(&report, format)
}

fn cmd_run(dir: &Path, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let batch = match config {
        Some(path) => Batch::from_config(&BatchConfig::from_yaml(&std::fs::read_to_string(path)?)?),
        None => Batch::standard(dir),
    };

    let reports = batch.run()?;
    match format {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report);
                println!();
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&reports)?),
    }
    Ok(())
}

fn cmd_example(dir: &Path, output_path: &Path) -> Result<()> {
    let config = Batch::standard(dir).to_config();
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example batch to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

fn cmd_presets(format: OutputFormat) -> Result<()> {
    let presets = StrataConfig::presets();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&presets)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&presets)?),
        OutputFormat::Text => {
            for preset in &presets {
                let columns = preset
                    .columns()
                    .map(|c| c.join(", "))
                    .unwrap_or_else(|| "discovered from data".to_string());
                println!("{:<10} {:<14} {}", preset.name, preset.category, columns);
            }
        }
    }
    Ok(())
}
