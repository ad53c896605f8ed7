//! Feature schema command

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_range, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    label: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Description")]
    description: String,
}

/// Show the features the service accepts
pub async fn show_schema(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let schema = client.schema().await?;

    if let OutputFormat::Json = format {
        crate::output::print_json(&schema);
        return Ok(());
    }

    let rows: Vec<FeatureRow> = schema
        .features
        .iter()
        .map(|f| FeatureRow {
            label: f.label.clone(),
            key: f.key.clone(),
            range: format_range(f.min, f.max),
            kind: if f.integer_only { "integer" } else { "decimal" },
            description: f.description.clone(),
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}
