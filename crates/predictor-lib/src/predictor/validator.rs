//! Input validation against the feature schema
//!
//! Turns raw form strings into a [`FeatureVector`]. Every field is checked
//! independently so callers can report all problems at once.

use crate::error::FieldError;
use crate::models::FeatureVector;
use crate::schema::{FeatureSchema, FeatureSpec, NUM_FEATURES};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Raw form input keyed by form field key
pub type RawFields = HashMap<String, String>;

/// Per-field validation errors keyed by form field key
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FieldErrors {
    errors: BTreeMap<&'static str, FieldError>,
}

impl FieldErrors {
    fn insert(&mut self, spec: &'static FeatureSpec, error: FieldError) {
        self.errors.insert(spec.key, error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.errors.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldError)> + '_ {
        self.errors.iter().map(|(key, err)| (*key, err))
    }

    /// Human-readable messages, e.g. `"Age must be at least 21"`
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(key, err)| {
                let label = FeatureSchema::by_key(key).map(|s| s.label).unwrap_or(*key);
                (key.to_string(), format!("{} {}", label, err))
            })
            .collect()
    }
}

/// Validates raw form input against [`FeatureSchema`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate all eight fields, returning a vector only if none failed
    pub fn validate(&self, raw: &RawFields) -> Result<FeatureVector, FieldErrors> {
        let mut values = [0.0; NUM_FEATURES];
        let mut errors = FieldErrors::default();

        for (idx, spec) in FeatureSchema::specs().iter().enumerate() {
            match validate_field(spec, raw.get(spec.key).map(String::as_str)) {
                Ok(value) => values[idx] = value,
                Err(e) => errors.insert(spec, e),
            }
        }

        if errors.is_empty() {
            Ok(FeatureVector::new(values))
        } else {
            Err(errors)
        }
    }
}

/// Check a single raw value against its feature bounds
pub fn validate_field(spec: &FeatureSpec, raw: Option<&str>) -> Result<f64, FieldError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(FieldError::Required);
    }

    let value: f64 = raw.parse().map_err(|_| FieldError::NotANumber)?;
    if !value.is_finite() {
        return Err(FieldError::NotANumber);
    }

    if spec.integer_only && value.fract() != 0.0 {
        return Err(FieldError::NotWholeNumber);
    }

    if value < spec.min {
        return Err(FieldError::BelowMinimum { min: spec.min });
    }
    if value > spec.max {
        return Err(FieldError::AboveMaximum { max: spec.max });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pima_first_record() -> RawFields {
        [
            ("pregnancies", "6"),
            ("glucose", "148"),
            ("bloodPressure", "72"),
            ("skinThickness", "35"),
            ("insulin", "0"),
            ("bmi", "33.6"),
            ("diabetesPedigreeFunction", "0.627"),
            ("age", "50"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn fields_at(pick: impl Fn(&FeatureSpec) -> f64) -> RawFields {
        FeatureSchema::specs()
            .iter()
            .map(|spec| (spec.key.to_string(), pick(spec).to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_record_validates() {
        let vector = Validator::new().validate(&pima_first_record()).unwrap();
        assert_eq!(
            vector.values(),
            &[6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0]
        );
    }

    #[test]
    fn test_bounds_are_accepted() {
        let validator = Validator::new();
        assert!(validator.validate(&fields_at(|s| s.min)).is_ok());
        assert!(validator.validate(&fields_at(|s| s.max)).is_ok());
    }

    #[test]
    fn test_one_unit_outside_bounds_rejected() {
        let validator = Validator::new();

        let errors = validator.validate(&fields_at(|s| s.min - 1.0)).unwrap_err();
        assert_eq!(errors.len(), NUM_FEATURES);
        for spec in FeatureSchema::specs() {
            assert_eq!(
                errors.get(spec.key),
                Some(&FieldError::BelowMinimum { min: spec.min }),
                "{}",
                spec.name
            );
        }

        let errors = validator.validate(&fields_at(|s| s.max + 1.0)).unwrap_err();
        assert_eq!(errors.len(), NUM_FEATURES);
        for spec in FeatureSchema::specs() {
            assert_eq!(
                errors.get(spec.key),
                Some(&FieldError::AboveMaximum { max: spec.max }),
                "{}",
                spec.name
            );
        }
    }

    #[test]
    fn test_midpoints_produce_ordered_vector() {
        let vector = Validator::new()
            .validate(&fields_at(|s| {
                let mid = (s.min + s.max) / 2.0;
                if s.integer_only {
                    mid.floor()
                } else {
                    mid
                }
            }))
            .unwrap();
        assert_eq!(vector.values().len(), NUM_FEATURES);
        assert_eq!(vector.values()[0], 8.0);
        assert_eq!(vector.get("Glucose"), Some(99.5));
        assert_eq!(vector.values()[7], 51.0);
    }

    #[test]
    fn test_pregnancies_must_be_whole() {
        let pregnancies = FeatureSchema::by_key("pregnancies").unwrap();
        assert_eq!(
            validate_field(pregnancies, Some("2.5")),
            Err(FieldError::NotWholeNumber)
        );
        assert_eq!(validate_field(pregnancies, Some("2")), Ok(2.0));
        assert_eq!(validate_field(pregnancies, Some("2.0")), Ok(2.0));

        let mut raw = pima_first_record();
        raw.insert("pregnancies".into(), "2.5".into());
        let errors = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(
            errors.messages()["pregnancies"],
            "Pregnancies must be a whole number"
        );
    }

    #[test]
    fn test_fractional_values_allowed_elsewhere() {
        let age = FeatureSchema::by_key("age").unwrap();
        assert_eq!(validate_field(age, Some("45.5")), Ok(45.5));
    }

    #[test]
    fn test_required_and_numeric_errors() {
        let glucose = FeatureSchema::by_key("glucose").unwrap();
        assert_eq!(validate_field(glucose, Some("")), Err(FieldError::Required));
        assert_eq!(validate_field(glucose, Some("   ")), Err(FieldError::Required));
        assert_eq!(validate_field(glucose, None), Err(FieldError::Required));
        assert_eq!(
            validate_field(glucose, Some("abc")),
            Err(FieldError::NotANumber)
        );
        assert_eq!(
            validate_field(glucose, Some("NaN")),
            Err(FieldError::NotANumber)
        );
        assert_eq!(
            validate_field(glucose, Some("inf")),
            Err(FieldError::NotANumber)
        );
        assert_eq!(validate_field(glucose, Some(" 120 ")), Ok(120.0));
    }

    #[test]
    fn test_errors_accumulate_without_partial_vector() {
        let mut raw = pima_first_record();
        raw.insert("glucose".into(), "".into());
        raw.insert("bmi".into(), "abc".into());
        raw.remove("age");

        let errors = Validator::new().validate(&raw).unwrap_err();
        assert_eq!(errors.len(), 3);

        let messages = errors.messages();
        assert_eq!(messages["glucose"], "Glucose is required");
        assert_eq!(messages["bmi"], "BMI must be a valid number");
        assert_eq!(messages["age"], "Age is required");
    }

    #[test]
    fn test_range_message_names_bound() {
        let mut raw = pima_first_record();
        raw.insert("age".into(), "18".into());
        raw.insert("bloodPressure".into(), "130".into());

        let messages = Validator::new().validate(&raw).unwrap_err().messages();
        assert_eq!(messages["age"], "Age must be at least 21");
        assert_eq!(messages["bloodPressure"], "Blood Pressure must be at most 122");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut raw = pima_first_record();
        raw.insert("Outcome".into(), "1".into());
        assert!(Validator::new().validate(&raw).is_ok());
    }
}
