use std::sync::Arc;

use chat_command_core::{
    ArraySchema, BooleanSchema, Limit, NumberSchema, Schema, SchemaBuilder, SchemaMap,
    StringSchema, ValidateOptions, ValidationOutcome, Validator, ValidatorOptions, ValueStore,
};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn schemas() -> Vec<Arc<dyn Schema>> {
    vec![
        Arc::new(StringSchema::new().min(1)),
        Arc::new(NumberSchema::new().min(0)),
        Arc::new(BooleanSchema::new()),
        Arc::new(ArraySchema::of(NumberSchema::new()).min(1)),
    ]
}

fn optional_schemas() -> Vec<Arc<dyn Schema>> {
    vec![
        Arc::new(StringSchema::new().optional()),
        Arc::new(NumberSchema::new().optional()),
        Arc::new(BooleanSchema::new().optional()),
        Arc::new(ArraySchema::new().optional()),
    ]
}

fn collect_all() -> Validator {
    Validator::new(ValidatorOptions {
        abort_early: false,
        coerce: true,
    })
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

#[test]
fn test_missing_required_value_yields_exactly_one_required_violation() {
    for schema in schemas() {
        for options in [ValidateOptions::default(), ValidateOptions::collect_all()] {
            let outcome = schema.validate(None, &options, &ValueStore::new()).unwrap();
            assert!(!outcome.pass());
            assert_eq!(outcome.errors.len(), 1, "schema {}", schema.kind());
            assert_eq!(outcome.errors[0].kind, "required");
        }
    }
}

#[test]
fn test_missing_optional_value_passes_as_null() {
    for schema in optional_schemas() {
        let outcome = schema
            .validate(None, &ValidateOptions::default(), &ValueStore::new())
            .unwrap();
        assert!(outcome.pass(), "schema {}", schema.kind());
        assert_eq!(outcome.value, Value::Null);
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

#[test]
fn test_coerce_mode_returns_declared_type() {
    let store = ValueStore::new();
    let options = ValidateOptions::default();

    let number = NumberSchema::new().validate(Some(&json!("42")), &options, &store).unwrap();
    assert_eq!(number.value, json!(42));
    assert!(number.value.is_number());

    let boolean = BooleanSchema::new().validate(Some(&json!("on")), &options, &store).unwrap();
    assert_eq!(boolean.value, json!(true));

    let array = ArraySchema::of(BooleanSchema::new())
        .validate(Some(&json!("yes,no")), &options, &store)
        .unwrap();
    assert_eq!(array.value, json!([true, false]));
}

#[test]
fn test_coercion_failure_skips_rules() {
    let schema = NumberSchema::new().min(1).max(2).integer();
    let outcome = schema
        .validate(Some(&json!("many")), &ValidateOptions::collect_all(), &ValueStore::new())
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, "number");
}

// ---------------------------------------------------------------------------
// Abort-early vs collect-all
// ---------------------------------------------------------------------------

#[test]
fn test_abort_early_never_exceeds_one_violation_per_field() {
    let schema = SchemaMap::new()
        .field("name", StringSchema::new().min(5).max(1).one_of(["zzzzz"]))
        .field("n", NumberSchema::new().min(10).max(0).integer().negative());

    let errors = Validator::default()
        .validate(&["abc", "2.5"], &schema)
        .unwrap()
        .into_result()
        .unwrap_err();
    for (_, list) in errors.iter() {
        assert_eq!(list.len(), 1);
    }
}

#[test]
fn test_collect_all_returns_one_violation_per_failing_rule() {
    let schema = SchemaMap::new().field("n", NumberSchema::new().min(10).integer().negative());
    let errors = collect_all()
        .validate(&["2.5"], &schema)
        .unwrap()
        .into_result()
        .unwrap_err();
    assert_eq!(errors.get("n").unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Arrays
// ---------------------------------------------------------------------------

#[test]
fn test_array_with_bad_element_attributes_index_path() {
    let schema = ArraySchema::of(NumberSchema::new());
    let outcome = schema
        .validate(Some(&json!([1, 2, "x"])), &ValidateOptions::collect_all(), &ValueStore::new())
        .unwrap();
    assert!(!outcome.pass());
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].field, "2");

    let prefixed = schema
        .validate(
            Some(&json!([1, 2, "x"])),
            &ValidateOptions::collect_all().with_path("ids"),
            &ValueStore::new(),
        )
        .unwrap();
    assert_eq!(prefixed.errors[0].field, "ids.2");
}

#[test]
fn test_nested_arrays_build_dotted_paths() {
    let schema = ArraySchema::of(ArraySchema::of(NumberSchema::new().positive()));
    let outcome = schema
        .validate(
            Some(&json!([[1], [2, -3]])),
            &ValidateOptions::collect_all().with_path("grid"),
            &ValueStore::new(),
        )
        .unwrap();
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].field, "grid.1.1");
    assert_eq!(outcome.errors[0].kind, "number.positive");
}

#[test]
fn test_shared_inner_schema_is_reused() {
    let inner: Arc<dyn Schema> = Arc::new(NumberSchema::new().integer());
    let a = ArraySchema::of_shared(Arc::clone(&inner));
    let b = ArraySchema::of_shared(Arc::clone(&inner));
    assert!(Arc::ptr_eq(a.inner().unwrap(), b.inner().unwrap()));
}

// ---------------------------------------------------------------------------
// Cross-field references
// ---------------------------------------------------------------------------

#[test]
fn test_reference_observes_coerced_value_not_raw_token() {
    let schema = SchemaMap::new()
        .field("a", NumberSchema::new())
        .field(
            "b",
            StringSchema::new().rule("sees_a", |ctx| {
                let entry = ctx.reference("a").ok_or_else(|| ctx.misconfigured("no a"))?;
                Ok(entry.value == json!(7) && entry.raw_value == json!("007"))
            }),
        );

    let outcome = Validator::default().validate(&["007", "x"], &schema).unwrap();
    assert!(outcome.is_valid());
}

#[test]
fn test_reference_bound_between_fields() {
    let schema = SchemaMap::new()
        .field("min", NumberSchema::new())
        .field("max", NumberSchema::new().min(Limit::reference("min")));

    match Validator::default().validate(&["5", "3"], &schema).unwrap() {
        ValidationOutcome::Invalid(errors) => {
            let error = &errors.get("max").unwrap()[0];
            assert_eq!(error.kind, "number.min");
            assert_eq!(error.message, "`max` must be at least the value of `min`");
        }
        ValidationOutcome::Valid(args) => panic!("expected errors, got {args:?}"),
    }
}

#[test]
fn test_schema_is_reusable_across_calls() {
    let schema = SchemaMap::new().field("n", NumberSchema::new().max(3));
    let validator = Validator::default();

    assert!(!validator.validate(&["9"], &schema).unwrap().is_valid());
    assert!(validator.validate(&["1"], &schema).unwrap().is_valid());
    assert!(!validator.validate(&["9"], &schema).unwrap().is_valid());
}
