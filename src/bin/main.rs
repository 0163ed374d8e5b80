//! ASiC-E Timestamper CLI
//!
//! Command-line interface for upgrading ASiC-E containers from XAdES-BES to
//! XAdES-T, validating containers and managing configuration.

use asice_timestamper::{
    domain::xades::ValidationReport,
    extend_container_file, inspect_container,
    infra::config::{ConfigManager, ExportFormat},
    services::container_store,
    ReextensionPolicy, TsaUrl,
};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asice-timestamper")]
#[command(about = "Upgrade ASiC-E XAdES-BES signatures to XAdES-T with an RFC 3161 timestamp")]
#[command(long_about = "
ASiC-E Timestamper - adds a signature timestamp to XAdES-BES signatures

EXAMPLES:
    # Extend in place using the configured Time-Stamp Authority
    asice-timestamper extend contract.asice

    # Write to a new file with a specific authority
    asice-timestamper extend contract.asice -o contract-t.asice --tsa-url http://tsa.example.com

    # Check a container without contacting any authority
    asice-timestamper validate contract.asice

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a signature timestamp into the container's signature
    Extend {
        /// ASiC-E container to extend
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Output file path (defaults to replacing the input file)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// Time-Stamp Authority URL (overrides config)
        #[arg(short, long, value_name = "URL")]
        tsa_url: Option<String>,

        /// Request timeout in seconds (overrides config)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Fail instead of adding a second timestamp
        #[arg(long)]
        reject_reextension: bool,
    },

    /// Check container structure and signature shape
    Validate {
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,
    },

    /// List container members
    Inspect {
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    let verbose = cli.verbose
        || config_manager
            .load_or_default()
            .is_ok_and(|config| config.verbose);
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Extend {
            input_file,
            output,
            tsa_url,
            timeout,
            reject_reextension,
        } => {
            handle_extend_command(
                &config_manager,
                input_file,
                output,
                tsa_url,
                timeout,
                reject_reextension,
            )
            .await?;
        }
        Commands::Validate { input_file } => handle_validate_command(input_file)?,
        Commands::Inspect { input_file } => handle_inspect_command(input_file)?,
        Commands::Config(config_cmd) => handle_config_command(&config_manager, config_cmd)?,
    }

    Ok(())
}

async fn handle_extend_command(
    config_manager: &ConfigManager,
    input_file: PathBuf,
    output: Option<PathBuf>,
    tsa_url: Option<String>,
    timeout: Option<u64>,
    reject_reextension: bool,
) -> Result<()> {
    let mut config = config_manager.load_or_default()?;
    if let Some(url) = tsa_url {
        config.tsa_url = TsaUrl::new(&url)?.to_string();
    }
    if let Some(secs) = timeout {
        config.timeout_seconds = secs;
    }
    if reject_reextension {
        config.reextension_policy = ReextensionPolicy::Reject;
    }

    let output_path = output.unwrap_or_else(|| input_file.clone());
    let outcome = extend_container_file(&input_file, &output_path, &config).await?;

    println!("✅ Signature extended to {}", outcome.state);
    println!("   Signature member: {}", outcome.signature_path);
    println!("   Message imprint: {}", outcome.imprint.to_hex());
    println!("   Timestamps now present: {}", outcome.timestamp_count);
    println!("   Manifest: {:?}", outcome.manifest);
    for warning in &outcome.warnings {
        println!("   ⚠️  {warning}");
    }
    println!("   Output: {}", output_path.display());
    Ok(())
}

fn handle_validate_command(input_file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input_file).into_diagnostic()?;
    let report = inspect_container(&bytes)?;

    println!("🔍 {}", input_file.display());
    print_report("Container", &report.structure);
    match (&report.signature_path, &report.signature) {
        (Some(path), Some(signature)) => {
            print_report(&format!("Signature ({path})"), signature);
            println!("   Signature timestamps: {}", report.timestamp_count);
        }
        _ => println!("   Signature: not found"),
    }

    if report.is_valid() {
        println!("✅ Container is valid");
        Ok(())
    } else {
        Err(miette!("{} is not a valid signed container", input_file.display()))
    }
}

fn print_report(label: &str, report: &ValidationReport) {
    let verdict = if report.valid { "valid" } else { "INVALID" };
    println!("   {label}: {verdict}");
    for error in &report.errors {
        println!("     ❌ {error}");
    }
    for warning in &report.warnings {
        println!("     ⚠️  {warning}");
    }
}

fn handle_inspect_command(input_file: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input_file).into_diagnostic()?;
    let archive = container_store::extract(&bytes)?;

    println!("📦 {} ({} members)", input_file.display(), archive.len());
    for member in archive.members() {
        if member.is_dir {
            println!("  {:<10} {:>10}  {}/", "dir", "-", member.path.trim_end_matches('/'));
        } else {
            println!(
                "  {:<10} {:>10}  {}",
                member.compression.to_string(),
                member.data.len(),
                member.path
            );
        }
    }
    if !archive.comment().is_empty() {
        println!("  Comment: {}", String::from_utf8_lossy(archive.comment()));
    }
    let signature_path = container_store::locate_signature_path(&archive)?;
    println!("  Signature member: {signature_path}");
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => {
            let exists = config_manager.config_path().exists();
            let config = config_manager.load_or_default()?;
            println!("📋 Current Configuration:");
            println!("  Time-Stamp Authority: {}", config.tsa_url);
            println!("  Timeout: {}s", config.timeout_seconds);
            println!("  User agent: {}", config.user_agent);
            println!("  Re-extension policy: {}", config.reextension_policy.as_str());
            println!("  Verbose: {}", config.verbose);
            if exists {
                println!(
                    "  Configuration file: {}",
                    config_manager.config_path().display()
                );
            } else {
                println!("  (defaults; use 'config init' to create a configuration file)");
            }
        }

        ConfigCommands::Init => {
            config_manager.load_or_create_default()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value)?;
            println!("✅ Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager.export_config(format.into())?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }
    }

    Ok(())
}
