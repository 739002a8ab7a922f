//! Assembly line CLI - run declarative pipelines over JSON/CSV records
//!
//! # Main Commands
//!
//! ```bash
//! assembly-line run books.json -c pipeline.json     # Run a pipeline, print JSON
//! assembly-line check pipeline.json                 # Validate a pipeline configuration
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! assembly-line parse input.csv     # Load JSON/CSV input and print it as JSON
//! assembly-line operations          # Show available transformation operations
//! assembly-line example-config      # Show an example pipeline configuration
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use assembly_line::{
    example_config, load_path, logging, operations_description, AssemblyLine, PipelineConfig,
    Settings,
};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "assembly-line")]
#[command(about = "Filter, overturn, transform, aggregate and transpose JSON records", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over an input file
    Run {
        /// Input file (JSON or CSV)
        input: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Engine settings (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Value used for absent paths (parsed as JSON, else taken as a string)
        #[arg(long)]
        default_value: Option<String>,

        /// Render dates in UTC instead of local time
        #[arg(long)]
        utc: bool,

        /// Truncate `timey` values to the hour instead of the day
        #[arg(long)]
        timey: bool,

        /// Exit with an error when diagnostics were produced
        #[arg(long)]
        strict: bool,
    },

    /// Load an input file and output it as JSON
    Parse {
        /// Input file (JSON or CSV)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline configuration
    Check {
        /// Pipeline configuration (JSON)
        config: PathBuf,
    },

    /// Show available transformation operations
    Operations,

    /// Show example pipeline configuration
    ExampleConfig,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            settings,
            output,
            default_value,
            utc,
            timey,
            strict,
        } => {
            let options = RunOptions {
                settings: settings.as_deref(),
                default_value,
                utc,
                timey,
                strict,
            };
            cmd_run(&input, &config, output.as_deref(), options)
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Check { config } => cmd_check(&config),

        Commands::Operations => cmd_operations(),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct RunOptions<'a> {
    settings: Option<&'a Path>,
    default_value: Option<String>,
    utc: bool,
    timey: bool,
    strict: bool,
}

fn build_settings(options: &RunOptions<'_>) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match options.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(raw) = &options.default_value {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        settings = settings.with_default_value(value);
    }
    if options.utc {
        settings = settings.with_output_local_time(false);
    }
    if options.timey {
        settings = settings.with_timey(true);
    }

    Ok(settings)
}

fn load_pipeline(path: &Path) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    Ok(PipelineConfig::from_json(&content)?)
}

fn cmd_run(
    input: &Path,
    config: &Path,
    output: Option<&Path>,
    options: RunOptions<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(input = %input.display(), "loading input");
    let loaded = load_path(input)?;
    tracing::info!(
        records = loaded.records.len(),
        format = ?loaded.format,
        encoding = %loaded.encoding,
        "input loaded"
    );

    let pipeline = load_pipeline(config)?;
    let engine = AssemblyLine::new(build_settings(&options)?);
    tracing::debug!(settings = ?engine.settings(), "engine ready");

    let result = engine.process_collection(loaded.records, &pipeline);
    tracing::info!("{}", result.summary());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    if options.strict && !result.is_clean() {
        return Err(format!(
            "{} diagnostics produced (--strict)",
            result.diagnostics.len()
        )
        .into());
    }

    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_path(input)?;

    eprintln!("Parsed: {}", input.display());
    eprintln!("   Format: {:?}", loaded.format);
    eprintln!("   Encoding: {}", loaded.encoding);
    if let Some(delimiter) = loaded.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
        eprintln!("   Columns: {}", loaded.headers.join(", "));
    }
    eprintln!("   Records: {}", loaded.records.len());

    let json = serde_json::to_string_pretty(&loaded.records)?;
    write_output(&json, output)
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_check(config: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(config)?;
    let problems = pipeline.problems();

    if problems.is_empty() {
        eprintln!(
            "{}: {} run(s), configuration is valid",
            config.display(),
            pipeline.runs().len()
        );
        return Ok(());
    }

    for problem in &problems {
        eprintln!("   - {}", problem);
    }
    Err(format!("{} problem(s) in {}", problems.len(), config.display()).into())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_config().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
