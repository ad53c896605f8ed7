//! Model session commands

use anyhow::Result;

use crate::client::{ApiClient, ModelStatus, ReloadResult};
use crate::output::{
    color_state, print_error, print_info, print_json, print_success, print_warning, OutputFormat,
};

fn print_status(status: &ModelStatus) {
    println!("Model:         {}", status.source);
    println!("State:         {}", color_state(&status.state));
    println!("Load attempts: {}", status.load_attempts);
    if let Some(reason) = &status.reason {
        println!("Reason:        {}", reason);
    }
}

/// Show the model session state
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status = client.model_status().await?;

    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Table => {
            print_status(&status);
            match status.state.as_str() {
                "unloaded" => print_info("The model loads on the first prediction"),
                "failed" => print_warning("Run `dpx model reload` to retry loading"),
                _ => {}
            }
        }
    }

    Ok(())
}

/// Retry loading the model
pub async fn reload(client: &ApiClient, format: OutputFormat) -> Result<()> {
    match client.reload_model().await? {
        ReloadResult::Reloaded(status) => {
            match format {
                OutputFormat::Json => print_json(&status),
                OutputFormat::Table => {
                    print_success("Model loaded");
                    print_status(&status);
                }
            }
            Ok(())
        }
        ReloadResult::Failed(failure) => {
            match format {
                OutputFormat::Json => print_json(&failure),
                OutputFormat::Table => {
                    print_error(&format!("Model reload failed: {}", failure.error));
                    print_status(&failure.model);
                }
            }
            anyhow::bail!("model reload failed")
        }
    }
}
