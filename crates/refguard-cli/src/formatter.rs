//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde_json::json;

use refguard_core::{CollectionSchema, ValidationResult};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// One row of a reverse-reference report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub collection: String,
    pub fields: Vec<String>,
    pub referenced: bool,
}

/// Format the registered collections.
pub fn format_collections(format: OutputFormat, schemas: &[CollectionSchema]) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Collection", "Fields", "References"]);
            for schema in schemas {
                let references: Vec<String> = schema
                    .fields
                    .iter()
                    .filter_map(|f| f.references.as_ref().map(|t| format!("{} -> {}", f.name, t)))
                    .collect();
                table.add_row(vec![
                    Cell::new(&schema.name),
                    Cell::new(schema.fields.len()),
                    Cell::new(references.join(", ")),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(schemas).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

/// Format manual validation results.
pub fn format_validation(format: OutputFormat, results: &[ValidationResult]) -> String {
    match format {
        OutputFormat::Table => {
            if results.is_empty() {
                return "No reference fields present".to_string();
            }
            let mut table = Table::new();
            table.set_header(vec!["Field", "Target", "Value", "Valid"]);
            for result in results {
                table.add_row(vec![
                    Cell::new(&result.field),
                    Cell::new(&result.target_collection),
                    Cell::new(&result.value),
                    Cell::new(if result.is_valid { "yes" } else { "no" }),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

/// Format a reverse-reference report.
pub fn format_references(format: OutputFormat, rows: &[ReferenceRow]) -> String {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                return "No collection references this one".to_string();
            }
            let mut table = Table::new();
            table.set_header(vec!["Collection", "Fields", "Referenced"]);
            for row in rows {
                table.add_row(vec![
                    Cell::new(&row.collection),
                    Cell::new(row.fields.join(", ")),
                    Cell::new(if row.referenced { "yes" } else { "no" }),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let rows: Vec<_> = rows
                .iter()
                .map(|row| {
                    json!({
                        "collection": row.collection,
                        "fields": row.fields,
                        "referenced": row.referenced,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

/// Format a write result.
pub fn format_affected(format: OutputFormat, affected: u64, message: &str) -> String {
    match format {
        OutputFormat::Table => format!("{} document(s) affected: {}", affected, message),
        OutputFormat::Json => json!({
            "affected": affected,
            "message": message,
        })
        .to_string(),
    }
}
