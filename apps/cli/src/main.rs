//! `fhirtypes` - decode, check and convert FHIR data types from the command line

mod commands;
mod logging;
mod settings;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use commands::{
    check::CheckCommand, convert::ConvertCommand, decode::DecodeCommand,
    export_table::ExportTableCommand, schema::SchemaCommand, Context,
};
use settings::Settings;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "fhirtypes", version, about = "FHIR R4 data type toolkit")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Schema type of the input (e.g. Dosage, Extension, Timing.Repeat)
    #[arg(short = 't', long = "type", global = true, value_name = "TYPE")]
    pub type_name: Option<String>,

    /// Keep unknown choice variants and elements instead of rejecting them
    #[arg(long, global = true)]
    pub lenient: bool,

    /// Maximum nesting depth
    #[arg(long, global = true, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Extra StructureDefinitions (file, bundle or directory)
    #[arg(long = "definitions", global = true, value_name = "PATH")]
    pub definitions: Vec<PathBuf>,

    /// Settings file (defaults to ./fhirtypes.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Decode one document and print it normalized
    Decode(DecodeCommand),
    /// Decode many documents; exits with 1 if any fails
    Check(CheckCommand),
    /// Convert between JSON and XML
    Convert(ConvertCommand),
    /// Show the fields of a type
    Schema(SchemaCommand),
    /// Write the registry as a compact schema table
    ExportTable(ExportTableCommand),
}

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(&cli.global).context("Failed to load configuration")?;
    logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?settings.decode.mode,
        max_depth = settings.decode.max_depth,
        "Starting fhirtypes"
    );

    let ctx = Context::new(&settings, cli.global.type_name.clone())?;

    let ok = match &cli.command {
        Commands::Decode(cmd) => cmd.execute(&ctx).map(|_| true)?,
        Commands::Check(cmd) => cmd.execute(&ctx)?,
        Commands::Convert(cmd) => cmd.execute(&ctx).map(|_| true)?,
        Commands::Schema(cmd) => cmd.execute(&ctx).map(|_| true)?,
        Commands::ExportTable(cmd) => cmd.execute(&ctx).map(|_| true)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["fhirtypes", "decode", "a.json", "--type", "Dosage", "--lenient"]);
        assert_eq!(cli.global.type_name.as_deref(), Some("Dosage"));
        assert!(cli.global.lenient);
        assert!(matches!(cli.command, Commands::Decode(_)));
    }
}
