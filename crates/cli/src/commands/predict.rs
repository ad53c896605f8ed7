//! Prediction and local validation commands

use anyhow::Result;
use clap::Args;
use predictor_lib::{
    predictor::{RawFields, Validator},
    FeatureSchema, PredictionOutcome,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_label, print_error, print_json, print_success, print_table, OutputFormat};

/// The eight clinical measurements, as typed on the command line
///
/// Values are passed through as text so validation sees exactly what the
/// user entered.
#[derive(Debug, Clone, Default, Args)]
pub struct FeatureArgs {
    /// Number of pregnancies (0-17)
    #[arg(long)]
    pub pregnancies: Option<String>,

    /// Glucose level in blood (0-199 mg/dL)
    #[arg(long)]
    pub glucose: Option<String>,

    /// Blood pressure measurement (0-122 mmHg)
    #[arg(long)]
    pub blood_pressure: Option<String>,

    /// Thickness of skin (0-99 mm)
    #[arg(long)]
    pub skin_thickness: Option<String>,

    /// Insulin level in blood (0-846 mIU/L)
    #[arg(long)]
    pub insulin: Option<String>,

    /// Body mass index (0-67.1)
    #[arg(long)]
    pub bmi: Option<String>,

    /// Diabetes pedigree function (0.08-2.42)
    #[arg(long, visible_alias = "dpf")]
    pub diabetes_pedigree_function: Option<String>,

    /// Age in years (21-81)
    #[arg(long)]
    pub age: Option<String>,
}

impl FeatureArgs {
    /// Raw fields keyed by form key; flags not given are left out
    pub fn to_raw_fields(&self) -> RawFields {
        [
            ("pregnancies", &self.pregnancies),
            ("glucose", &self.glucose),
            ("bloodPressure", &self.blood_pressure),
            ("skinThickness", &self.skin_thickness),
            ("insulin", &self.insulin),
            ("bmi", &self.bmi),
            ("diabetesPedigreeFunction", &self.diabetes_pedigree_function),
            ("age", &self.age),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}

#[derive(Tabled, Serialize)]
struct FeatureValueRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Value")]
    value: f64,
}

#[derive(Tabled)]
struct DiagnosisRow {
    #[tabled(rename = "Diagnosis")]
    diagnosis: String,
    #[tabled(rename = "Label")]
    label: u8,
}

fn report_field_errors(field_errors: &BTreeMap<String, String>) -> Result<()> {
    for message in field_errors.values() {
        print_error(message);
    }
    anyhow::bail!("{} field(s) failed validation", field_errors.len())
}

/// Send the measurements to the service and print the diagnosis
pub async fn predict(client: &ApiClient, args: &FeatureArgs, format: OutputFormat) -> Result<()> {
    let outcome = client.predict(&args.to_raw_fields()).await?;

    if let OutputFormat::Json = format {
        print_json(&outcome);
        if !outcome.is_success() {
            anyhow::bail!("prediction did not succeed");
        }
        return Ok(());
    }

    match outcome {
        PredictionOutcome::Success { label } => {
            let rows = [DiagnosisRow {
                diagnosis: color_label(label),
                label: label.as_u8(),
            }];
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            Ok(())
        }
        PredictionOutcome::ValidationFailure { field_errors } => report_field_errors(&field_errors),
        PredictionOutcome::InferenceFailure { reason, detail } => {
            print_error(&format!("Prediction failed ({}): {}", reason, detail));
            anyhow::bail!("prediction failed: {}", reason)
        }
    }
}

/// Validate the measurements locally, without contacting the service
pub fn validate(args: &FeatureArgs, format: OutputFormat) -> Result<()> {
    match Validator::new().validate(&args.to_raw_fields()) {
        Ok(vector) => {
            let rows: Vec<FeatureValueRow> = FeatureSchema::specs()
                .iter()
                .zip(vector.values().iter())
                .map(|(spec, value)| FeatureValueRow {
                    feature: spec.label.to_string(),
                    value: *value,
                })
                .collect();

            if let OutputFormat::Table = format {
                print_success("All fields are valid");
            }
            print_table(&rows, format);
            Ok(())
        }
        Err(errors) => {
            let messages = errors.messages();
            if let OutputFormat::Json = format {
                print_json(&messages);
            }
            report_field_errors(&messages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_fields_use_form_keys() {
        let args = FeatureArgs {
            blood_pressure: Some("72".into()),
            diabetes_pedigree_function: Some("0.627".into()),
            ..Default::default()
        };
        let raw = args.to_raw_fields();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw["bloodPressure"], "72");
        assert_eq!(raw["diabetesPedigreeFunction"], "0.627");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let args = FeatureArgs {
            pregnancies: Some("6".into()),
            ..Default::default()
        };
        let err = validate(&args, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("7 field(s)"));
    }
}
