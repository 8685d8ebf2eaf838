//! Special purpose data types: Reference, Meta, Dosage and Extension

use super::general::*;
use super::metadata::*;
use crate::choice::ChoiceField;
use crate::choice_type;
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A reference from one resource to another
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Literal reference, relative, internal or absolute URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Type the reference refers to (e.g. "Patient")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }
}

/// Metadata about a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<Coding>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Coding>>,
}

choice_type! {
    /// Dosage.asNeeded[x]
    pub enum DosageAsNeeded("Dosage.asNeeded[x]", "asNeeded") {
        Boolean(bool) = "boolean",
        CodeableConcept(CodeableConcept) = "CodeableConcept",
    }
}

/// How the medication is/was taken or should be taken
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier_extension: Option<Vec<Extension>>,

    /// The order of the dosage instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,

    /// Free text dosage instructions e.g. SIG
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instruction: Option<Vec<CodeableConcept>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_instruction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,

    #[serde(flatten)]
    pub as_needed: ChoiceField<DosageAsNeeded>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_and_rate: Option<Vec<DosageDoseAndRate>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dose_per_period: Option<Ratio>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dose_per_administration: Option<SimpleQuantity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dose_per_lifetime: Option<SimpleQuantity>,
}

choice_type! {
    pub enum DoseAndRateDose("Dosage.doseAndRate.dose[x]", "dose") {
        Range(Range) = "Range",
        Quantity(SimpleQuantity) = "Quantity",
    }
}

choice_type! {
    pub enum DoseAndRateRate("Dosage.doseAndRate.rate[x]", "rate") {
        Ratio(Ratio) = "Ratio",
        Range(Range) = "Range",
        Quantity(SimpleQuantity) = "Quantity",
    }
}

/// Amount of medication administered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DosageDoseAndRate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodeableConcept>,

    #[serde(flatten)]
    pub dose: ChoiceField<DoseAndRateDose>,

    #[serde(flatten)]
    pub rate: ChoiceField<DoseAndRateRate>,
}

choice_type! {
    /// Extension.value[x] over every R4 type allowed for extension values
    pub enum ExtensionValue("Extension.value[x]", "value") with Unrecognized {
        Base64Binary(String) = "base64Binary",
        Boolean(bool) = "boolean",
        Canonical(String) = "canonical",
        Code(String) = "code",
        Date(String) = "date",
        DateTime(String) = "dateTime",
        Decimal(Number) = "decimal",
        Id(String) = "id",
        Instant(String) = "instant",
        Integer(i32) = "integer",
        Markdown(String) = "markdown",
        Oid(String) = "oid",
        PositiveInt(u32) = "positiveInt",
        String(String) = "string",
        Time(String) = "time",
        UnsignedInt(u32) = "unsignedInt",
        Uri(String) = "uri",
        Url(String) = "url",
        Uuid(String) = "uuid",
        Address(Box<Address>) = "Address",
        Age(Box<Age>) = "Age",
        Annotation(Box<Annotation>) = "Annotation",
        Attachment(Box<Attachment>) = "Attachment",
        CodeableConcept(Box<CodeableConcept>) = "CodeableConcept",
        Coding(Box<Coding>) = "Coding",
        ContactPoint(Box<ContactPoint>) = "ContactPoint",
        Count(Box<Count>) = "Count",
        Distance(Box<Distance>) = "Distance",
        Duration(Box<Duration>) = "Duration",
        HumanName(Box<HumanName>) = "HumanName",
        Identifier(Box<Identifier>) = "Identifier",
        Money(Box<Money>) = "Money",
        Period(Box<Period>) = "Period",
        Quantity(Box<Quantity>) = "Quantity",
        Range(Box<Range>) = "Range",
        Ratio(Box<Ratio>) = "Ratio",
        Reference(Box<Reference>) = "Reference",
        SampledData(Box<SampledData>) = "SampledData",
        Signature(Box<Signature>) = "Signature",
        Timing(Box<Timing>) = "Timing",
        ContactDetail(Box<ContactDetail>) = "ContactDetail",
        Contributor(Box<Contributor>) = "Contributor",
        DataRequirement(Box<DataRequirement>) = "DataRequirement",
        Expression(Box<Expression>) = "Expression",
        ParameterDefinition(Box<ParameterDefinition>) = "ParameterDefinition",
        RelatedArtifact(Box<RelatedArtifact>) = "RelatedArtifact",
        TriggerDefinition(Box<TriggerDefinition>) = "TriggerDefinition",
        UsageContext(Box<UsageContext>) = "UsageContext",
        Dosage(Box<Dosage>) = "Dosage",
        Meta(Box<Meta>) = "Meta",
    }
}

/// Optional extension element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Nested extensions (complex extensions carry no value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Identifies the meaning of the extension
    pub url: String,

    #[serde(flatten)]
    pub value: ChoiceField<ExtensionValue>,
}

impl Extension {
    pub fn new(url: impl Into<String>, value: ExtensionValue) -> Self {
        Self {
            id: None,
            extension: None,
            url: url.into(),
            value: ChoiceField::new(value),
        }
    }

    /// Extension carrying nested extensions instead of a value
    pub fn complex(url: impl Into<String>, extension: Vec<Extension>) -> Self {
        Self {
            id: None,
            extension: Some(extension),
            url: url.into(),
            value: ChoiceField::none(),
        }
    }
}
