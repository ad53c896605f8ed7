//! Feature schema for the diabetes classifier
//!
//! The eight accepted measurements, their inclusive bounds and type
//! constraints. Order is significant: it is the positional layout of
//! [`FeatureVector`](crate::models::FeatureVector) and the order tensors are
//! handed to the model.

use serde::Serialize;

/// Number of features the classifier consumes
pub const NUM_FEATURES: usize = 8;

/// A single accepted input feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    /// Model input name (the ONNX graph input this feature feeds)
    pub name: &'static str,
    /// Key of the raw form field carrying this feature
    pub key: &'static str,
    /// Human-readable label used in error messages
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub integer_only: bool,
    pub description: &'static str,
}

impl FeatureSpec {
    /// Returns true if `value` lies within `[min, max]`
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

static FEATURES: [FeatureSpec; NUM_FEATURES] = [
    FeatureSpec {
        name: "Pregnancies",
        key: "pregnancies",
        label: "Pregnancies",
        min: 0.0,
        max: 17.0,
        integer_only: true,
        description: "Number of pregnancies (0-17)",
    },
    FeatureSpec {
        name: "Glucose",
        key: "glucose",
        label: "Glucose",
        min: 0.0,
        max: 199.0,
        integer_only: false,
        description: "Glucose level in blood (0-199 mg/dL)",
    },
    FeatureSpec {
        name: "BloodPressure",
        key: "bloodPressure",
        label: "Blood Pressure",
        min: 0.0,
        max: 122.0,
        integer_only: false,
        description: "Blood pressure measurement (0-122 mmHg)",
    },
    FeatureSpec {
        name: "SkinThickness",
        key: "skinThickness",
        label: "Skin Thickness",
        min: 0.0,
        max: 99.0,
        integer_only: false,
        description: "Thickness of skin (0-99 mm)",
    },
    FeatureSpec {
        name: "Insulin",
        key: "insulin",
        label: "Insulin",
        min: 0.0,
        max: 846.0,
        integer_only: false,
        description: "Insulin level in blood (0-846 mIU/L)",
    },
    FeatureSpec {
        name: "BMI",
        key: "bmi",
        label: "BMI",
        min: 0.0,
        max: 67.1,
        integer_only: false,
        description: "Body mass index (0-67.1)",
    },
    FeatureSpec {
        name: "DiabetesPedigreeFunction",
        key: "diabetesPedigreeFunction",
        label: "Diabetes Pedigree Function",
        min: 0.08,
        max: 2.42,
        integer_only: false,
        description: "Diabetes pedigree function (0.08-2.42)",
    },
    FeatureSpec {
        name: "Age",
        key: "age",
        label: "Age",
        min: 21.0,
        max: 81.0,
        integer_only: false,
        description: "Age in years (21-81)",
    },
];

/// Immutable table of accepted features
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureSchema;

impl FeatureSchema {
    /// All feature specs in positional order
    pub fn specs() -> &'static [FeatureSpec; NUM_FEATURES] {
        &FEATURES
    }

    /// Look up a feature by its raw form key
    pub fn by_key(key: &str) -> Option<&'static FeatureSpec> {
        FEATURES.iter().find(|spec| spec.key == key)
    }

    /// Look up a feature by its model input name
    pub fn by_name(name: &str) -> Option<&'static FeatureSpec> {
        FEATURES.iter().find(|spec| spec.name == name)
    }

    /// Model input names in positional order
    pub fn input_names() -> impl Iterator<Item = &'static str> {
        FEATURES.iter().map(|spec| spec.name)
    }
}
