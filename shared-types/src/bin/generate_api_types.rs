use shared_types::*;
use std::fs;
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Output directory can be overridden with the first argument
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("api-types"));

    let types = vec![
        // Contact records
        clean_type(LinkPrecedence::export_to_string()?),
        clean_type(Contact::export_to_string()?),
        // Identify endpoint
        clean_type(IdentifyRequest::export_to_string()?),
        clean_type(ConsolidatedContact::export_to_string()?),
        clean_type(IdentifyResponse::export_to_string()?),
        clean_type(ErrorResponse::export_to_string()?),
    ];

    fs::create_dir_all(&output_dir)?;

    let output_path = output_dir.join("types.ts");
    fs::write(&output_path, types.join("\n"))?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

/// All types land in one file, so per-type imports and banners are dropped.
fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    let result = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
