//! Typed R4 data types
//!
//! - `general`: general purpose types (Coding, Quantity, Timing, ...)
//! - `metadata`: types used by conformance and knowledge resources
//! - `special`: Reference, Meta, Dosage and Extension

pub mod general;
pub mod metadata;
pub mod special;

pub use general::*;
pub use metadata::*;
pub use special::*;

use crate::typed::impl_fhir_type;

impl_fhir_type! {
    Address => "Address",
    Annotation => "Annotation",
    Attachment => "Attachment",
    CodeableConcept => "CodeableConcept",
    Coding => "Coding",
    ContactPoint => "ContactPoint",
    HumanName => "HumanName",
    Identifier => "Identifier",
    Money => "Money",
    Period => "Period",
    Quantity => "Quantity",
    Range => "Range",
    Ratio => "Ratio",
    SampledData => "SampledData",
    Signature => "Signature",
    Timing => "Timing",
    TimingRepeat => "Timing.Repeat",
    Population => "Population",
    ContactDetail => "ContactDetail",
    Contributor => "Contributor",
    DataRequirement => "DataRequirement",
    DataRequirementCodeFilter => "DataRequirement.CodeFilter",
    DataRequirementDateFilter => "DataRequirement.DateFilter",
    DataRequirementSort => "DataRequirement.Sort",
    Expression => "Expression",
    ParameterDefinition => "ParameterDefinition",
    RelatedArtifact => "RelatedArtifact",
    TriggerDefinition => "TriggerDefinition",
    UsageContext => "UsageContext",
    Reference => "Reference",
    Meta => "Meta",
    Dosage => "Dosage",
    DosageDoseAndRate => "Dosage.DoseAndRate",
    Extension => "Extension",
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::{ChoiceField, ChoiceType};
    use crate::error::Error;
    use crate::typed::FhirType;
    use serde_json::json;

    #[test]
    fn test_extension_value_variants() {
        let ext = Extension::from_json(&json!({
            "url": "http://example.org/weight",
            "valueQuantity": {"value": 70.5, "unit": "kg"}
        }))
        .unwrap();
        match ext.value.get() {
            Some(ExtensionValue::Quantity(q)) => assert_eq!(q.unit.as_deref(), Some("kg")),
            other => panic!("unexpected value: {other:?}"),
        }
        assert_eq!(ext.value.get().unwrap().wire_key(), "valueQuantity");

        let back = ext.to_json().unwrap();
        assert_eq!(back["valueQuantity"]["value"], json!(70.5));
        assert_eq!(back["url"], json!("http://example.org/weight"));
    }

    #[test]
    fn test_extension_conflict() {
        let err = Extension::from_json(&json!({
            "url": "http://example.org/x",
            "valueString": "a",
            "valueBoolean": true
        }))
        .unwrap_err();
        assert!(matches!(err, Error::ChoiceConflict { .. }));
    }

    #[test]
    fn test_usage_context_requires_value() {
        let err = UsageContext::from_json(&json!({
            "code": {"system": "http://terminology.hl7.org/CodeSystem/usage-context-type", "code": "age"}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::RequiredFieldMissing { .. }));
        assert_eq!(err.path(), Some("UsageContext.value[x]"));
    }

    #[test]
    fn test_population_age_range() {
        let input = json!({
            "ageRange": {"low": {"value": 18, "unit": "a"}, "high": {"value": 65, "unit": "a"}},
            "gender": {"text": "female"}
        });
        let population = Population::from_json(&input).unwrap();
        assert!(matches!(population.age.get(), Some(PopulationAge::Range(_))));
        assert_eq!(population.to_json().unwrap(), input);
    }

    #[test]
    fn test_dose_and_rate() {
        let dosage = Dosage::from_json(&json!({
            "text": "1 tablet daily",
            "asNeededBoolean": false,
            "doseAndRate": [{"doseQuantity": {"value": 1, "unit": "tablet"}}]
        }))
        .unwrap();
        assert_eq!(dosage.as_needed.get(), Some(&DosageAsNeeded::Boolean(false)));
        let dose_and_rate = &dosage.dose_and_rate.as_ref().unwrap()[0];
        assert!(matches!(dose_and_rate.dose.get(), Some(DoseAndRateDose::Quantity(_))));
        assert!(dose_and_rate.rate.is_none());
    }

    #[test]
    fn test_typed_ignores_metadata_only_variant() {
        let ext = Extension::from_json(&json!({
            "url": "http://example.org/x",
            "_valueString": {"id": "s1"}
        }))
        .unwrap();
        assert!(ext.value.is_none());
    }

    #[test]
    fn test_validate_constructed_value() {
        let ext = Extension::new("http://example.org/flag", ExtensionValue::Boolean(true));
        assert!(ext.validate().is_ok());

        let bad = Extension {
            id: None,
            extension: None,
            url: "http://example.org/date".into(),
            value: ChoiceField::new(ExtensionValue::Date("2024-13-45".into())),
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidPrimitive { .. })));
    }

    #[test]
    fn test_signature_type_required() {
        let err = Signature::new(vec![], "2024-01-01T00:00:00Z", Reference::to("Practitioner/1")).unwrap_err();
        assert_eq!(err.path(), Some("Signature.type"));
    }

    #[test]
    fn test_recursive_timing_in_trigger() {
        let trigger = TriggerDefinition::from_json(&json!({
            "type": "periodic",
            "timingTiming": {"repeat": {"frequency": 1, "period": 1, "periodUnit": "d"}}
        }))
        .unwrap();
        match trigger.timing.get() {
            Some(TriggerDefinitionTiming::Timing(timing)) => {
                assert_eq!(timing.repeat.as_ref().unwrap().period_unit.as_deref(), Some("d"))
            }
            other => panic!("unexpected timing: {other:?}"),
        }
    }
}
