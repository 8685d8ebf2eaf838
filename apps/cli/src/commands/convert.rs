use super::{read_input, write_output, Context, Format};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

/// Convert between FHIR JSON and XML
///
/// With `--type`, XML is read against the schema so repeated fields come back
/// as arrays and numbers and booleans keep their JSON types. Without it the
/// shape is guessed.
#[derive(Debug, Args)]
pub struct ConvertCommand {
    /// JSON or XML document, `-` for stdin
    pub input: PathBuf,

    /// Target format (defaults to the other one)
    #[arg(long, value_enum)]
    pub to: Option<Format>,

    /// Root element name for XML output of a data type
    #[arg(long)]
    pub element: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConvertCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let content = read_input(&self.input)?;
        let from = Format::detect(&self.input, &content);
        let to = self.to.unwrap_or_else(|| from.other());
        debug!(?from, ?to, "Converting");

        let value = ctx.parse_document(&self.input, &content)?;
        let rendered = ctx.render(&value, ctx.type_name(), to, self.element.as_deref())?;
        write_output(self.output.as_deref(), &rendered)
    }
}
