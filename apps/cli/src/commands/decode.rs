use super::{write_output, Context, Format};
use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Decode one document and print it in normalized form
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// JSON or XML document, `-` for stdin
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: Format,

    /// Root element name for XML output of a data type
    #[arg(long)]
    pub element: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DecodeCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let document = ctx.read_document(&self.input)?;
        let type_name = ctx.resolve_type(&document)?;

        let record = ctx
            .decoder()
            .decode(&type_name, &document)
            .with_context(|| format!("{} is not a valid {}", self.input.display(), type_name))?;
        info!(type_name = %type_name, fields = record.len(), "Decoded document");

        let value = ctx.encoder().encode(&record);
        let rendered = ctx.render(&value, Some(&type_name), self.format, self.element.as_deref())?;
        write_output(self.output.as_deref(), &rendered)
    }
}
