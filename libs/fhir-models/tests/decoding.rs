use fhirtypes_models::{
    ChoiceNode, Coding, DecodeMode, DecodeOptions, Decoder, Dosage, Encoder, Error, Extension,
    ExtensionValue, FhirType, FieldValue, Population, Timing,
};
use fhirtypes_schema::table::SchemaTable;
use fhirtypes_schema::SchemaRegistry;
use serde_json::{json, Value};
use std::{fs::File, path::PathBuf};

fn load_fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name);
    assert!(path.exists(), "fixture missing at {:?}", path);

    let file = File::open(&path).expect("failed to open fixture");
    serde_json::from_reader(file).expect("failed to parse fixture")
}

#[test]
fn dosage_round_trips_through_records() {
    let input = load_fixture("dosage.json");
    let record = Decoder::r4().decode("Dosage", &input).unwrap();

    assert_eq!(record.primitive("text").unwrap().as_str(), Some("Take 1 tablet twice daily with food"));
    assert_eq!(record.choice("asNeeded").unwrap().type_code(), "boolean");

    let repeat = record.record("timing").unwrap().record("repeat").unwrap();
    assert_eq!(repeat.type_name(), "Timing.Repeat");
    assert_eq!(repeat.choice("bounds").unwrap().type_code(), "Period");

    let dose_and_rate = record.get("doseAndRate").and_then(FieldValue::as_list).unwrap();
    let dose = dose_and_rate[0].as_record().unwrap().choice("dose").unwrap();
    assert_eq!(dose.type_code(), "Quantity");

    assert_eq!(Encoder::new().encode(&record), input);
}

#[test]
fn dosage_round_trips_through_typed_records() {
    let input = load_fixture("dosage.json");
    let dosage = Dosage::from_json(&input).unwrap();

    assert_eq!(dosage.sequence, Some(1));
    let repeat = dosage.timing.as_ref().and_then(|t| t.repeat.as_ref()).unwrap();
    assert_eq!(repeat.frequency, Some(2));
    assert!(repeat.bounds.is_some());

    assert_eq!(dosage.to_json().unwrap(), input);
}

#[test]
fn batch_decoding_reports_each_document() {
    let documents = match load_fixture("extensions.json") {
        Value::Array(items) => items,
        other => panic!("expected an array, got {other}"),
    };
    let results = Decoder::r4().decode_batch("Extension", &documents);

    assert_eq!(results.len(), 5);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    assert!(matches!(
        &results[3],
        Err(Error::ChoiceConflict { path, keys }) if path == "Extension.value[x]" && keys.len() == 2
    ));

    let race = results[4].as_ref().unwrap();
    let parts: Vec<_> = race.extensions().collect();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].choice("value").unwrap().type_code(), "Coding");
}

#[test]
fn conflict_wins_over_leniency() {
    let input = json!({"url": "http://example.org/x", "valueString": "a", "_valueBoolean": {"id": "b"}});
    for decoder in [Decoder::r4(), Decoder::r4().lenient()] {
        let err = decoder.decode("Extension", &input).unwrap_err();
        assert!(matches!(err, Error::ChoiceConflict { .. }));
    }
}

#[test]
fn unknown_variant_strict_and_lenient() {
    let input = json!({"url": "http://example.org/x", "valueFooBar": 1});

    let err = Decoder::r4().decode("Extension", &input).unwrap_err();
    match err {
        Error::UnknownVariant { path, key } => {
            assert_eq!(path, "Extension.value[x]");
            assert_eq!(key, "valueFooBar");
        }
        other => panic!("unexpected error: {other}"),
    }

    let record = Decoder::r4().lenient().decode("Extension", &input).unwrap();
    assert!(matches!(
        record.choice("value"),
        Some(ChoiceNode::Unrecognized { key, value: Some(v), .. }) if key == "valueFooBar" && *v == json!(1)
    ));
    assert_eq!(Encoder::new().encode(&record), input);

    let ext = Extension::from_json_with(&Decoder::r4().lenient(), &input).unwrap();
    assert_eq!(
        ext.value.get(),
        Some(&ExtensionValue::Unrecognized {
            key: "valueFooBar".into(),
            value: json!(1)
        })
    );
    assert_eq!(ext.to_json().unwrap(), input);
}

#[test]
fn lenient_mode_keeps_unknown_elements() {
    let input = json!({"start": "2024-01-01", "colour": "blue"});

    let err = Decoder::r4().decode("Period", &input).unwrap_err();
    assert!(matches!(err, Error::UnknownElement { ref key, .. } if key == "colour"));

    let options = DecodeOptions {
        mode: DecodeMode::Lenient,
        ..DecodeOptions::default()
    };
    let record = Decoder::r4().with_options(options).decode("Period", &input).unwrap();
    assert_eq!(record.unrecognized().get("colour"), Some(&json!("blue")));
    assert_eq!(Encoder::new().encode(&record), input);
}

#[test]
fn typed_records_refuse_lenient_leftovers() {
    let lenient = Decoder::r4().lenient();

    let input = json!({"ageFooBar": 3});
    assert!(lenient.decode("Population", &input).is_ok());
    let err = Population::from_json_with(&lenient, &input).unwrap_err();
    assert!(matches!(err, Error::NotRepresentable { ref key, .. } if key == "ageFooBar"));
    assert_eq!(err.path(), Some("Population.age[x]"));

    let input = json!({"system": "http://x", "colour": "red"});
    let err = Coding::from_json_with(&lenient, &input).unwrap_err();
    assert!(matches!(err, Error::NotRepresentable { ref key, .. } if key == "colour"));
    assert_eq!(err.path(), Some("Coding"));

    let input = json!({"timing": {"repeat": {"frequency": 2, "colour": "red"}}});
    let err = Dosage::from_json_with(&lenient, &input).unwrap_err();
    assert_eq!(err.path(), Some("Dosage.timing.repeat"));

    // nested extensions keep their unknown variants
    let input = json!({"extension": [{"url": "http://example.org/x", "valueFooBar": 1}], "text": "once"});
    let dosage = Dosage::from_json_with(&lenient, &input).unwrap();
    assert_eq!(dosage.to_json().unwrap(), input);
}

#[test]
fn typed_records_from_json_text() {
    let coding = Coding::from_json_str(r#"{"system": "http://loinc.org", "code": "8867-4"}"#).unwrap();
    assert_eq!(coding.code.as_deref(), Some("8867-4"));

    let err = Coding::from_json_str(r#"{"system": "http://loinc.org", "colour": "red"}"#).unwrap_err();
    assert!(matches!(err, Error::UnknownElement { ref key, .. } if key == "colour"));

    assert!(matches!(Coding::from_json_str("{not json"), Err(Error::Serialization(_))));
}

#[test]
fn reserved_sibling_is_not_a_variant() {
    let table = SchemaTable::from_json(
        r#"{
            "fhirVersion": "4.0.1",
            "types": [{
                "name": "FilterRule",
                "kind": "complex-type",
                "base": "Element",
                "elements": [
                    { "name": "valueSet", "card": "0..1", "types": ["canonical"] },
                    { "name": "value[x]", "card": "0..1", "types": ["string", "Coding"] }
                ]
            }]
        }"#,
    )
    .unwrap();
    let mut registry = SchemaRegistry::with_r4_datatypes().unwrap();
    table.apply(&mut registry).unwrap();

    let input = json!({
        "valueSet": "http://example.org/ValueSet/vitals",
        "valueCoding": {"system": "http://loinc.org", "code": "8867-4"}
    });
    let record = Decoder::new(&registry).decode("FilterRule", &input).unwrap();
    assert_eq!(record.choice("value").unwrap().type_code(), "Coding");
    assert!(record.primitive("valueSet").is_some());
}

#[test]
fn cardinality_is_checked() {
    let too_many = json!({"family": "Chalmers", "period": [{"start": "2020"}, {"start": "2021"}]});
    let err = Decoder::r4().decode("HumanName", &too_many).unwrap_err();
    assert!(matches!(err, Error::TooMany { ref path, max: 1, found: 2 } if path == "HumanName.period"));

    // a one-element list for a singular field is accepted
    let one = json!({"family": "Chalmers", "period": [{"start": "2020"}]});
    let record = Decoder::r4().decode("HumanName", &one).unwrap();
    assert!(record.record("period").is_some());

    let missing = json!({"when": "2024-01-01T10:00:00Z", "who": {"reference": "Practitioner/1"}});
    let err = Decoder::r4().decode("Signature", &missing).unwrap_err();
    assert!(matches!(err, Error::RequiredFieldMissing { ref path } if path == "Signature.type"));
}

#[test]
fn usage_context_requires_a_value() {
    let input = json!({"code": {"code": "focus"}});
    let err = Decoder::r4().decode("UsageContext", &input).unwrap_err();
    assert!(matches!(err, Error::RequiredFieldMissing { ref path } if path == "UsageContext.value[x]"));
}

#[test]
fn primitive_errors_carry_paths() {
    let input = json!({"repeat": {"frequency": 0, "periodUnit": "d"}});
    let err = Timing::from_json(&input).unwrap_err();
    assert_eq!(err.path(), Some("Timing.repeat.frequency"));
    assert!(matches!(err, Error::InvalidPrimitive { ref type_code, .. } if type_code == "positiveInt"));

    let input = json!({"given": ["Peter", 7]});
    let err = Decoder::r4().decode("HumanName", &input).unwrap_err();
    assert_eq!(err.path(), Some("HumanName.given[1]"));
}

#[test]
fn primitive_metadata_survives_round_trip() {
    let input = json!({
        "url": "http://example.org/birth",
        "_valueDateTime": {
            "extension": [{
                "url": "http://hl7.org/fhir/StructureDefinition/data-absent-reason",
                "valueCode": "masked"
            }]
        }
    });
    let record = Decoder::r4().decode("Extension", &input).unwrap();
    let node = record.choice("value").and_then(ChoiceNode::node).unwrap();
    let primitive = node.as_primitive().unwrap();
    assert!(primitive.value.is_none());
    assert!(primitive.meta.is_some());

    assert_eq!(Encoder::new().encode(&record), input);
}

#[test]
fn extended_registry_enforces_required_choice() {
    let table = SchemaTable::from_json(
        r#"{
            "fhirVersion": "4.0.1",
            "types": [{
                "name": "StrictDoseAndRate",
                "kind": "complex-type",
                "base": "Element",
                "elements": [
                    { "name": "dose[x]", "card": "1..1", "types": ["Range", "Quantity"] },
                    { "name": "rate[x]", "card": "0..1", "types": ["Ratio", "Range", "Quantity"] }
                ]
            }]
        }"#,
    )
    .unwrap();
    let mut registry = SchemaRegistry::with_r4_datatypes().unwrap();
    table.apply(&mut registry).unwrap();

    let decoder = Decoder::new(&registry);
    let err = decoder
        .decode("StrictDoseAndRate", &json!({"rateRatio": {"numerator": {"value": 1}}}))
        .unwrap_err();
    assert!(matches!(err, Error::RequiredFieldMissing { ref path } if path == "StrictDoseAndRate.dose[x]"));

    let record = decoder
        .decode("StrictDoseAndRate", &json!({"doseRange": {"low": {"value": 1}}}))
        .unwrap();
    assert_eq!(record.choice("dose").unwrap().type_code(), "Range");
}

#[test]
fn resource_type_and_nulls_are_ignored() {
    let input = json!({"resourceType": "Coding", "system": "http://loinc.org", "code": "8867-4", "display": null});
    let record = Decoder::r4().decode("Coding", &input).unwrap();
    assert_eq!(record.len(), 2);
}
