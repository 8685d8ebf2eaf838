use super::{write_output, Context};
use anyhow::{Context as _, Result};
use clap::Args;
use fhirtypes_schema::{SchemaRegistry, SchemaTable};
use std::path::PathBuf;
use tracing::info;

/// Export the registry, including types from --definitions, as a compact schema table
#[derive(Debug, Args)]
pub struct ExportTableCommand {
    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// FHIR version recorded in the table
    #[arg(long, default_value = "4.0.1")]
    pub fhir_version: String,

    /// Leave out the embedded R4 data types
    #[arg(long)]
    pub definitions_only: bool,
}

impl ExportTableCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let mut table = SchemaTable::from_registry(ctx.registry(), &self.fhir_version);
        if self.definitions_only {
            let r4 = SchemaRegistry::r4();
            table.types.retain(|t| !r4.contains(&t.name));
        }
        info!(types = table.types.len(), "Exporting schema table");

        let json = table
            .to_json_pretty()
            .context("Failed to serialize the schema table")?;
        write_output(self.output.as_deref(), &json)
    }
}
