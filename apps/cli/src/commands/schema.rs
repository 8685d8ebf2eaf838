use super::{write_output, Context};
use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use fhirtypes_schema::{BindingStrength, FieldSchema, TypeKind, TypeSchema};
use std::fmt::Write as _;

/// Print the field metadata of a type, or list the known types
#[derive(Debug, Args)]
pub struct SchemaCommand {
    /// Type name (falls back to --type)
    pub name: Option<String>,

    /// Print the schema as JSON
    #[arg(long)]
    pub json: bool,

    /// Only list types of this kind
    #[arg(long, value_enum)]
    pub kind: Option<Kind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    PrimitiveType,
    ComplexType,
    Backbone,
    Resource,
}

impl From<Kind> for TypeKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::PrimitiveType => TypeKind::PrimitiveType,
            Kind::ComplexType => TypeKind::ComplexType,
            Kind::Backbone => TypeKind::Backbone,
            Kind::Resource => TypeKind::Resource,
        }
    }
}

impl SchemaCommand {
    pub fn execute(&self, ctx: &Context) -> Result<()> {
        let Some(name) = self.name.as_deref().or(ctx.type_name()) else {
            return write_output(None, &list_types(ctx, self.kind.map(TypeKind::from)));
        };

        let schema = ctx
            .registry()
            .get(name)
            .ok_or_else(|| anyhow!("unknown type '{name}'"))?;

        let rendered = if self.json {
            serde_json::to_string_pretty(schema)?
        } else {
            describe(schema)
        };
        write_output(None, &rendered)
    }
}

fn list_types(ctx: &Context, kind: Option<TypeKind>) -> String {
    let registry = ctx.registry();
    let types: Vec<&TypeSchema> = match kind {
        Some(kind) => registry.types_of_kind(kind).collect(),
        None => registry.types().collect(),
    };
    let mut names: Vec<(&str, TypeKind)> = types.iter().map(|t| (t.name.as_str(), t.kind)).collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    names
        .into_iter()
        .map(|(name, kind)| format!("{:<32} {}", name, kind_label(kind)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe(schema: &TypeSchema) -> String {
    let mut out = format!("{} ({})", schema.name, kind_label(schema.kind));
    if let Some(base) = &schema.base {
        let _ = write!(out, " : {base}");
    }
    for field in &schema.fields {
        let _ = write!(out, "\n  {}", describe_field(field));
    }
    out
}

fn describe_field(field: &FieldSchema) -> String {
    let mut line = format!(
        "{:<28} {:<6} {}",
        field.element_name(),
        field.cardinality.to_string(),
        field.types.join(" | ")
    );
    if field.is_modifier {
        line.push_str(" ?!");
    }
    if let Some(binding) = &field.binding {
        let _ = write!(line, " [{}", strength_label(binding.strength));
        if let Some(value_set) = &binding.value_set {
            let _ = write!(line, ": {value_set}");
        }
        line.push(']');
    }
    line
}

fn kind_label(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::PrimitiveType => "primitive-type",
        TypeKind::ComplexType => "complex-type",
        TypeKind::Backbone => "backbone",
        TypeKind::Resource => "resource",
    }
}

fn strength_label(strength: BindingStrength) -> &'static str {
    match strength {
        BindingStrength::Required => "required",
        BindingStrength::Extensible => "extensible",
        BindingStrength::Preferred => "preferred",
        BindingStrength::Example => "example",
    }
}
