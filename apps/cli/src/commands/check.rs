use super::{read_input, Context};
use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Report {
    Text,
    Json,
}

/// Decode many documents and report each outcome
///
/// A JSON file holding an array is checked element by element; `.ndjson`
/// files line by line.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Files to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub report: Report,
}

#[derive(Debug, Serialize)]
struct Outcome {
    document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Outcome {
    fn failed(document: String, type_name: Option<String>, error: impl ToString) -> Self {
        Self {
            document,
            type_name,
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

impl CheckCommand {
    /// Returns whether every document decoded
    pub fn execute(&self, ctx: &Context) -> Result<bool> {
        let mut entries = Vec::new();
        for path in &self.inputs {
            match load_documents(ctx, path) {
                Ok(documents) => entries.extend(documents),
                Err(e) => entries.push((path.display().to_string(), Err(format!("{e:#}")))),
            }
        }

        // decoded documents, in input order
        let documents: Vec<Value> = entries
            .iter()
            .filter_map(|(_, document)| document.as_ref().ok().cloned())
            .collect();
        let mut results = match ctx.type_name() {
            Some(type_name) => ctx
                .decoder()
                .decode_batch(type_name, &documents)
                .into_iter()
                .map(|result| {
                    let result = result.map(|_| ()).map_err(|e| e.to_string());
                    (Some(type_name.to_string()), result)
                })
                .collect::<Vec<_>>(),
            None => documents.iter().map(|document| check_untyped(ctx, document)).collect(),
        }
        .into_iter();

        let mut outcomes = Vec::with_capacity(entries.len());
        for (label, document) in entries {
            let (type_name, result) = match document {
                Ok(_) => results
                    .next()
                    .unwrap_or_else(|| (None, Err("not decoded".to_string()))),
                Err(e) => (None, Err(e)),
            };
            outcomes.push(match result {
                Ok(()) => Outcome {
                    document: label,
                    type_name,
                    ok: true,
                    error: None,
                },
                Err(e) => Outcome::failed(label, type_name, e),
            });
        }

        let failed = outcomes.iter().filter(|o| !o.ok).count();
        info!(documents = outcomes.len(), failed, "Check finished");
        self.print(&outcomes, failed)?;
        Ok(failed == 0)
    }

    fn print(&self, outcomes: &[Outcome], failed: usize) -> Result<()> {
        match self.report {
            Report::Json => println!("{}", serde_json::to_string_pretty(outcomes)?),
            Report::Text => {
                for outcome in outcomes {
                    match &outcome.error {
                        None => println!("{}: ok", outcome.document),
                        Some(error) => println!("{}: FAILED {}", outcome.document, error),
                    }
                }
                println!("{} documents, {} failed", outcomes.len(), failed);
            }
        }
        Ok(())
    }
}

/// Decode with the document's own `resourceType`
fn check_untyped(ctx: &Context, document: &Value) -> (Option<String>, Result<(), String>) {
    let type_name = match ctx.resolve_type(document) {
        Ok(type_name) => type_name,
        Err(e) => return (None, Err(e.to_string())),
    };
    let result = ctx
        .decoder()
        .decode(&type_name, document)
        .map(|_| ())
        .map_err(|e| e.to_string());
    (Some(type_name), result)
}

/// Labelled documents of one input file; `.ndjson` lines fail one by one
fn load_documents(ctx: &Context, path: &Path) -> Result<Vec<(String, Result<Value, String>)>> {
    let content = read_input(path)?;
    let name = path.display().to_string();

    if path.extension().and_then(|e| e.to_str()) == Some("ndjson") {
        return Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                let document = serde_json::from_str(line).map_err(|e| format!("invalid JSON: {e}"));
                (format!("{name}:{}", idx + 1), document)
            })
            .collect());
    }

    match ctx.parse_document(path, &content)? {
        Value::Array(items) => {
            if items.is_empty() {
                warn!(file = %name, "No documents in file");
            }
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| (format!("{name}[{idx}]"), Ok(item)))
                .collect())
        }
        value => Ok(vec![(name, Ok(value))]),
    }
}
