//! `classmate models`: list the Gemini models usable for generation.

use anyhow::{Context, Result};

use classmate_core::model::GeminiClient;

/// Model family offered for generation.
const MODEL_FAMILY: &str = "flash";

fn usable_models(names: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = names
        .into_iter()
        .filter(|n| n.contains(MODEL_FAMILY))
        .collect();
    names.sort();
    names
}

pub async fn run_models(client: &GeminiClient) -> Result<()> {
    let names = client
        .list_models()
        .await
        .context("failed to list models")?;
    let names = usable_models(names);

    if names.is_empty() {
        println!("No {MODEL_FAMILY} models available.");
        return Ok(());
    }
    let current = &client.config().model;
    for name in &names {
        let marker = if name == current { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}
