//! Capsule type validation
//!
//! Checks dynamic values against declared capsule and list-of-capsule types.
//! Compatibility is decided by discriminator keys on the value (`type` for a
//! specific provider, `resource_type` for the generic base types), never by
//! comparing the wrapped native types.
//!
//! Two entry points:
//!
//! - [`validate_value`] checks a single attribute value. Plain object types
//!   are not validated.
//! - [`validate_default`] walks a default-value tree where only some leaves
//!   are capsule-typed and accumulates diagnostics across siblings.
//!
//! Neither function fails; every finding is an error [`Diagnostic`].
//!
//! # Example
//!
//! ```rust
//! use tether::connection::ConnectionRegistry;
//! use tether::validate::{validate_value, ValidationSubject};
//! use tether::value::{Type, Value};
//!
//! let registry = ConnectionRegistry::new();
//! let declared = Type::parse("connection.slack", &registry).unwrap();
//! let actual = Value::from_json(serde_json::json!({"type": "slack"}));
//!
//! let diags = validate_value(&ValidationSubject::new(declared, actual));
//! assert!(diags.is_empty());
//! ```

use crate::domain::{Diagnostic, Diagnostics, SourceRange};
use crate::value::{CapsuleType, Type, Value, RESOURCE_TYPE_KEY, TYPE_KEY};
use std::collections::BTreeMap;

pub const VALUE_NOT_A_MAP: &str = "value must be a map if the type is a capsule";
pub const VALUE_MISSING_TYPE: &str = "missing type in value";
pub const VALUE_TYPE_MISMATCH: &str = "value type mismatched with the capsule type";

pub const DEFAULT_NOT_A_LIST: &str = "default value must be a list if the type is a list of capsules";
pub const DEFAULT_ELEMENT_NOT_A_MAP: &str =
    "default value must be a map if the type is a list of capsules";
pub const DEFAULT_MISSING_TYPE: &str = "missing type in default value";
pub const DEFAULT_TYPE_MISMATCH: &str = "default value type mismatched with the capsule type";

/// The unit the validator consumes
#[derive(Debug, Clone)]
pub struct ValidationSubject {
    pub declared: Type,
    pub actual: Value,
    pub range: Option<SourceRange>,
}

impl ValidationSubject {
    pub fn new(declared: Type, actual: Value) -> Self {
        Self {
            declared,
            actual,
            range: None,
        }
    }

    pub fn with_range(mut self, range: Option<SourceRange>) -> Self {
        self.range = range;
        self
    }
}

/// Message set for single values and for list elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phrasing {
    Value,
    ListElement,
}

impl Phrasing {
    fn not_a_map(self) -> &'static str {
        match self {
            Phrasing::Value => VALUE_NOT_A_MAP,
            Phrasing::ListElement => DEFAULT_ELEMENT_NOT_A_MAP,
        }
    }

    fn missing_type(self) -> &'static str {
        match self {
            Phrasing::Value => VALUE_MISSING_TYPE,
            Phrasing::ListElement => DEFAULT_MISSING_TYPE,
        }
    }

    fn mismatch(self) -> &'static str {
        match self {
            Phrasing::Value => VALUE_TYPE_MISMATCH,
            Phrasing::ListElement => DEFAULT_TYPE_MISMATCH,
        }
    }
}

/// Validates a single attribute value against its declared type
pub fn validate_value(subject: &ValidationSubject) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if let Some(diag) = check_attribute(&subject.declared, &subject.actual, subject.range.as_ref())
    {
        diags.push(diag);
    }
    diags
}

/// Validates a default-value tree against its declared type
///
/// Maps that carry no discriminator key at the current level are recursed
/// into; maps that do are checked directly, as are undiscriminated maps
/// with nothing to recurse into. Declared object, tuple and map
/// types are walked by their child types. Diagnostics accumulate.
pub fn validate_default(subject: &ValidationSubject) -> Diagnostics {
    let mut diags = Diagnostics::new();
    walk_default(
        &subject.declared,
        &subject.actual,
        subject.range.as_ref(),
        &mut diags,
    );
    diags
}

fn check_attribute(declared: &Type, actual: &Value, range: Option<&SourceRange>) -> Option<Diagnostic> {
    if *declared == Type::Dynamic || actual.type_of() == *declared {
        return None;
    }

    match declared {
        Type::Capsule(capsule) => check_capsule_value(capsule, actual, Phrasing::Value, range),
        Type::List(element) | Type::Set(element) => match element.as_ref() {
            Type::Capsule(capsule) => check_capsule_list(capsule, actual, range),
            _ => None,
        },
        // object and other structural types are too complex to validate here
        _ => None,
    }
}

fn walk_default(declared: &Type, actual: &Value, range: Option<&SourceRange>, diags: &mut Diagnostics) {
    if *declared == Type::Dynamic || actual.type_of() == *declared {
        return;
    }

    match declared {
        Type::Capsule(capsule) => match actual {
            Value::Map(fields)
                if !carries_discriminator(fields) && fields.values().any(reaches_leaf) =>
            {
                for child in fields.values() {
                    walk_default(declared, child, range, diags);
                }
            }
            _ => {
                if let Some(diag) = check_capsule_value(capsule, actual, Phrasing::Value, range) {
                    diags.push(diag);
                }
            }
        },
        Type::List(element) | Type::Set(element) => match (element.as_ref(), actual) {
            (Type::Capsule(capsule), _) => {
                if let Some(diag) = check_capsule_list(capsule, actual, range) {
                    diags.push(diag);
                }
            }
            (element, Value::List(items)) => {
                for item in items {
                    walk_default(element, item, range, diags);
                }
            }
            _ => {}
        },
        Type::Map(element) => {
            if let Value::Map(fields) = actual {
                for child in fields.values() {
                    walk_default(element, child, range, diags);
                }
            }
        }
        Type::Object(field_types) => {
            if let Value::Map(fields) = actual {
                for (key, field_type) in field_types {
                    if let Some(child) = fields.get(key) {
                        walk_default(field_type, child, range, diags);
                    }
                }
            }
        }
        Type::Tuple(element_types) => {
            if let Value::List(items) = actual {
                for (element_type, item) in element_types.iter().zip(items) {
                    walk_default(element_type, item, range, diags);
                }
            }
        }
        Type::Dynamic | Type::String | Type::Number | Type::Bool => {}
    }
}

fn carries_discriminator(fields: &BTreeMap<String, Value>) -> bool {
    fields.contains_key(RESOURCE_TYPE_KEY) || fields.contains_key(TYPE_KEY)
}

/// True when walking `value` ends at something the capsule check inspects
fn reaches_leaf(value: &Value) -> bool {
    match value {
        Value::Map(fields) if !carries_discriminator(fields) => fields.values().any(reaches_leaf),
        _ => true,
    }
}

/// Checks every element of a list against `capsule`, stopping at the first failure
fn check_capsule_list(
    capsule: &CapsuleType,
    actual: &Value,
    range: Option<&SourceRange>,
) -> Option<Diagnostic> {
    let Some(items) = actual.as_list() else {
        return Some(Diagnostic::error(DEFAULT_NOT_A_LIST).with_subject(range.cloned()));
    };

    let element_type = Type::Capsule(capsule.clone());
    items.iter().enumerate().find_map(|(index, item)| {
        if item.type_of() == element_type {
            return None;
        }
        check_capsule_value(capsule, item, Phrasing::ListElement, range).map(|diag| {
            let detail = match diag.detail.as_deref() {
                Some(detail) => format!("element {index}: {detail}"),
                None => format!("element {index}"),
            };
            diag.with_detail(detail)
        })
    })
}

/// Checks one value against one capsule type
fn check_capsule_value(
    capsule: &CapsuleType,
    actual: &Value,
    phrasing: Phrasing,
    range: Option<&SourceRange>,
) -> Option<Diagnostic> {
    let Some(fields) = actual.as_map() else {
        return Some(
            Diagnostic::error(phrasing.not_a_map())
                .with_detail(format!("expected {}", capsule.name()))
                .with_subject(range.cloned()),
        );
    };

    let native = capsule.native();
    let (key, expected) = if let Some(discriminator) = native.connection_capability() {
        (TYPE_KEY, discriminator)
    } else if let Some(kind) = native.base_kind() {
        (RESOURCE_TYPE_KEY, kind.as_str())
    } else {
        return Some(
            Diagnostic::error(phrasing.mismatch())
                .with_detail(format!(
                    "{} does not wrap a connection or notifier type",
                    capsule.name()
                ))
                .with_subject(range.cloned()),
        );
    };

    match fields.get(key) {
        None => Some(
            Diagnostic::error(phrasing.missing_type())
                .with_detail(format!("expected key '{key}' with value '{expected}'"))
                .with_subject(range.cloned()),
        ),
        Some(found) if found.as_str() == Some(expected) => None,
        Some(found) => Some(
            Diagnostic::error(phrasing.mismatch())
                .with_detail(format!(
                    "expected {key} '{expected}', found {}",
                    describe(found)
                ))
                .with_subject(range.cloned()),
        ),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.type_of().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{BaseNative, CapsuleValue, NativeType, ResourceKind};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Provider(&'static str);

    impl NativeType for Provider {
        fn type_name(&self) -> &str {
            self.0
        }

        fn connection_capability(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl NativeType for Opaque {
        fn type_name(&self) -> &str {
            "opaque"
        }
    }

    fn aws() -> Type {
        Type::Capsule(CapsuleType::new("connection.aws", Arc::new(Provider("aws"))))
    }

    fn subject(declared: Type, json: serde_json::Value) -> ValidationSubject {
        ValidationSubject::new(declared, Value::from_json(json))
    }

    #[test]
    fn test_dynamic_type_accepts_anything() {
        let diags = validate_value(&subject(Type::Dynamic, json!(42)));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_specific_capsule_requires_type_key() {
        let missing = validate_value(&subject(aws(), json!({"resource_type": "connection"})));
        assert_eq!(missing.len(), 1);
        assert_eq!(missing.iter().next().unwrap().summary, VALUE_MISSING_TYPE);

        let mismatched = validate_value(&subject(aws(), json!({"type": "gcp"})));
        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched.iter().next().unwrap().summary, VALUE_TYPE_MISMATCH);

        let ok = validate_value(&subject(aws(), json!({"type": "aws"})));
        assert!(ok.is_empty());
    }

    #[test]
    fn test_non_string_type_key_is_mismatch() {
        let diags = validate_value(&subject(aws(), json!({"type": 7})));
        assert_eq!(diags.iter().next().unwrap().summary, VALUE_TYPE_MISMATCH);
    }

    #[test]
    fn test_capsule_requires_map() {
        let diags = validate_value(&subject(aws(), json!("aws")));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, VALUE_NOT_A_MAP);
    }

    #[test]
    fn test_generic_bases_use_resource_type() {
        let connection = Type::Capsule(CapsuleType::generic_connection());
        assert!(validate_value(&subject(
            connection.clone(),
            json!({"resource_type": "connection", "type": "slack"})
        ))
        .is_empty());
        assert_eq!(
            validate_value(&subject(connection.clone(), json!({"type": "slack"})))
                .iter()
                .next()
                .unwrap()
                .summary,
            VALUE_MISSING_TYPE
        );

        let notifier = Type::Capsule(CapsuleType::notifier());
        assert!(validate_value(&subject(notifier.clone(), json!({"resource_type": "notifier"}))).is_empty());
        assert_eq!(
            validate_value(&subject(notifier, json!({"resource_type": "connection"})))
                .iter()
                .next()
                .unwrap()
                .summary,
            VALUE_TYPE_MISMATCH
        );
    }

    #[test]
    fn test_other_native_types_always_mismatch() {
        let opaque = Type::Capsule(CapsuleType::new("opaque", Arc::new(Opaque)));
        let diags = validate_value(&subject(opaque, json!({"resource_type": "connection", "type": "aws"})));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, VALUE_TYPE_MISMATCH);
    }

    #[test]
    fn test_capsule_reference_of_same_type_passes() {
        let capsule = CapsuleType::new("connection.aws", Arc::new(Provider("aws")));
        let value = Value::Capsule(CapsuleValue::new(capsule.clone(), Arc::new(())));
        let diags = validate_value(&ValidationSubject::new(Type::Capsule(capsule), value));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_list_of_capsule() {
        let declared = Type::list(aws());

        let not_list = validate_value(&subject(declared.clone(), json!({"type": "aws"})));
        assert_eq!(not_list.len(), 1);
        assert_eq!(not_list.iter().next().unwrap().summary, DEFAULT_NOT_A_LIST);

        let good = validate_value(&subject(declared.clone(), json!([{"type": "aws"}, {"type": "aws"}])));
        assert!(good.is_empty());

        let bad = validate_value(&subject(
            declared,
            json!([{"type": "aws"}, {"name": "x"}, {"type": "gcp"}]),
        ));
        assert_eq!(bad.len(), 1, "list validation stops at the first bad element");
        let diag = bad.iter().next().unwrap();
        assert_eq!(diag.summary, DEFAULT_MISSING_TYPE);
        assert!(diag.detail.as_deref().unwrap().starts_with("element 1"));
    }

    #[test]
    fn test_list_element_phrasing() {
        let declared = Type::list(aws());
        let not_map = validate_value(&subject(declared.clone(), json!(["aws"])));
        assert_eq!(not_map.iter().next().unwrap().summary, DEFAULT_ELEMENT_NOT_A_MAP);

        let mismatch = validate_value(&subject(declared, json!([{"type": "gcp"}])));
        assert_eq!(mismatch.iter().next().unwrap().summary, DEFAULT_TYPE_MISMATCH);
    }

    #[test]
    fn test_object_types_are_not_validated() {
        let mut fields = BTreeMap::new();
        fields.insert("conn".to_string(), aws());
        let diags = validate_value(&subject(Type::Object(fields), json!({"conn": "not a map"})));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_diagnostics_carry_range() {
        let range = SourceRange::lines("tether.toml", 4, 6);
        let diags = validate_value(&subject(aws(), json!({})).with_range(Some(range.clone())));
        assert_eq!(diags.iter().next().unwrap().subject, Some(range));
    }

    #[test]
    fn test_default_tree_recurses_into_undiscriminated_maps() {
        let diags = validate_default(&subject(
            aws(),
            json!({"primary": {"type": "aws"}, "backup": {"type": "gcp"}, "other": {"type": "azure"}}),
        ));
        assert_eq!(diags.len(), 2, "sibling errors accumulate");
    }

    #[test]
    fn test_default_tree_empty_maps_are_missing_type() {
        for value in [json!({}), json!({"a": {}}), json!({"a": {"b": {}}, "c": {}})] {
            let diags = validate_default(&subject(aws(), value));
            assert_eq!(diags.len(), 1);
            assert_eq!(diags.iter().next().unwrap().summary, VALUE_MISSING_TYPE);
        }
    }

    #[test]
    fn test_default_tree_empty_leaf_beside_valid_sibling() {
        let diags = validate_default(&subject(
            aws(),
            json!({"empty": {}, "primary": {"type": "aws"}}),
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, VALUE_MISSING_TYPE);
    }

    #[test]
    fn test_default_tree_checks_discriminated_maps_directly() {
        let notifier = Type::Capsule(CapsuleType::new(
            "notifier",
            Arc::new(BaseNative(ResourceKind::Notifier)),
        ));
        let diags = validate_default(&subject(
            notifier,
            json!({"resource_type": "connection", "nested": {"resource_type": "notifier"}}),
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, VALUE_TYPE_MISMATCH);
    }

    #[test]
    fn test_default_tree_heterogeneous_tuple() {
        let declared = Type::Tuple(vec![Type::String, aws(), Type::Bool]);
        let ok = validate_default(&subject(declared.clone(), json!(["x", {"type": "aws"}, true])));
        assert!(ok.is_empty());

        let bad = validate_default(&subject(declared, json!(["x", {"type": "slack"}, true])));
        assert_eq!(bad.len(), 1);
    }

    #[test]
    fn test_default_tree_object_and_nested_lists() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Type::String);
        fields.insert("targets".to_string(), Type::list(aws()));
        fields.insert("fallback".to_string(), aws());
        let declared = Type::Object(fields);

        let diags = validate_default(&subject(
            declared,
            json!({"name": "x", "targets": [{"type": "aws"}, {}], "fallback": "nope"}),
        ));
        let summaries: Vec<&str> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.contains(&VALUE_NOT_A_MAP));
        assert!(summaries.contains(&DEFAULT_MISSING_TYPE));
    }
}
