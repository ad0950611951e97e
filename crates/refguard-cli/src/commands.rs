//! Subcommand execution.

use std::path::Path;

use serde_json::Value;

use refguard_core::reference::{has_living_reference, scan_referencing_collections};
use refguard_core::{CollectionSchema, DocumentId, GuardConfig, UpdatePayload};
use refguard_store::Database;

use crate::formatter::{self, ReferenceRow};
use crate::{CliConfig, Command};

type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Open the database and execute one subcommand.
pub async fn run(config: CliConfig, command: Command) -> CommandResult<()> {
    tracing::info!("opening database");
    let db = Database::open(config.store.clone())?;
    tracing::info!(collections = db.collection_names().len(), "database opened");

    let name = command.name();
    let output = execute(&db, &config, command).await?;
    db.flush()?;
    tracing::info!(command = name, "command completed");
    println!("{}", output);
    Ok(())
}

/// Execute a subcommand against an open database and render its output.
pub async fn execute(db: &Database, config: &CliConfig, command: Command) -> CommandResult<String> {
    let format = config.format;
    match command {
        Command::ApplySchema { file } => {
            let schemas: Vec<CollectionSchema> = serde_json::from_value(read_json(&file)?)?;
            let count = schemas.len() as u64;
            for schema in schemas {
                db.register_collection(schema)?;
            }
            Ok(formatter::format_affected(format, count, "schemas applied"))
        }

        Command::Collections => Ok(formatter::format_collections(format, &db.catalog().schemas())),

        Command::Insert { collection, file } => {
            attach_guards(db, &config.guard)?;
            let handle = db.collection(&collection)?;
            let documents = match read_json(&file)? {
                Value::Array(items) => items,
                other => vec![other],
            };

            let mut ids = Vec::with_capacity(documents.len());
            for document in documents {
                ids.push(handle.save_value(document).await?.to_string());
            }
            let message = format!("saved {}/{}", collection, ids.join(","));
            Ok(formatter::format_affected(format, ids.len() as u64, &message))
        }

        Command::Update {
            collection,
            id,
            payload_file,
        } => {
            attach_guards(db, &config.guard)?;
            let handle = db.collection(&collection)?;
            let payload = UpdatePayload::from_value(read_json(&payload_file)?)
                .ok_or("update payload must be a JSON object")?;
            let filter = refguard_core::Filter::by_id(
                &handle.schema().identity_field,
                &DocumentId::from(id.as_str()),
            );

            let affected = handle.update_one(&filter, &payload).await?;
            Ok(formatter::format_affected(
                format,
                affected,
                &format!("updated {}/{}", collection, id),
            ))
        }

        Command::Delete { collection, id } => {
            attach_guards(db, &config.guard)?;
            let handle = db.collection(&collection)?;
            let affected = handle.delete_by_id(&DocumentId::from(id.as_str())).await?;
            Ok(formatter::format_affected(
                format,
                affected,
                &format!("deleted {}/{}", collection, id),
            ))
        }

        Command::Check { collection, file } => {
            db.attach_guard(&collection, config.guard.clone())?;
            let handle = db.collection(&collection)?;
            let data = read_json(&file)?;
            let data = data.as_object().ok_or("document must be a JSON object")?;

            let results = handle.validate_references(data).await?;
            Ok(formatter::format_validation(format, &results))
        }

        Command::Refs { collection, id } => {
            if !db.catalog().contains(&collection) {
                return Err(format!("unknown collection: {}", collection).into());
            }
            let id = DocumentId::from(id.as_str());

            let mut rows = Vec::new();
            for referencing in scan_referencing_collections(&collection, db.catalog()) {
                let referenced = has_living_reference(db.engine(), &referencing, &id).await?;
                rows.push(ReferenceRow {
                    collection: referencing.collection,
                    fields: referencing.fields,
                    referenced,
                });
            }
            Ok(formatter::format_references(format, &rows))
        }
    }
}

/// Attach a guard with the CLI's configuration to every collection.
fn attach_guards(db: &Database, config: &GuardConfig) -> CommandResult<()> {
    for name in db.collection_names() {
        db.attach_guard(&name, config.clone())?;
    }
    Ok(())
}

fn read_json(path: &Path) -> CommandResult<Value> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&contents)?)
}
