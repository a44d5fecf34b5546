use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::models::TargetDocument;
use crate::store::{DocumentSink, WriteDisposition};

pub const SQLITE_SCHEMA_VERSION: &str = "twin-migrate.documents.v1";
pub const DOCUMENTS_TABLE: &str = "documents";
pub const SCHEMA_META_TABLE: &str = "document_store_meta";

const CREATE_DOCUMENTS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    database_name TEXT NOT NULL,
    collection TEXT NOT NULL,
    key_field TEXT NOT NULL,
    natural_key TEXT NOT NULL,
    body_json TEXT NOT NULL,
    PRIMARY KEY (database_name, collection, key_field, natural_key),
    CHECK (json_valid(body_json))
);
"#;

const CREATE_INDEX_COLLECTION_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_documents_collection
ON documents (database_name, collection);
"#;

const CREATE_META_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS document_store_meta (
    schema_version TEXT NOT NULL,
    applied_at_utc TEXT NOT NULL
);
"#;

const SELECT_BODY_SQL: &str = "SELECT body_json FROM documents
     WHERE database_name = ?1 AND collection = ?2 AND key_field = ?3 AND natural_key = ?4";

const UPSERT_BODY_SQL: &str = "INSERT INTO documents (database_name, collection, key_field, natural_key, body_json)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(database_name, collection, key_field, natural_key)
     DO UPDATE SET body_json = excluded.body_json";

#[must_use]
pub fn schema_statements() -> &'static [&'static str] {
    &[
        CREATE_DOCUMENTS_TABLE_SQL,
        CREATE_INDEX_COLLECTION_SQL,
        CREATE_META_TABLE_SQL,
    ]
}

#[must_use]
pub fn create_schema_sql() -> String {
    schema_statements().join("\n")
}

pub fn open_sqlite_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create sqlite parent directory: {}",
                parent.display()
            )
        })?;
    }

    Connection::open(path)
        .with_context(|| format!("failed to open sqlite database: {}", path.display()))
}

pub fn ensure_sqlite_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(&create_schema_sql())
        .context("failed to create sqlite schema")?;

    if schema_meta_has_version(connection, SQLITE_SCHEMA_VERSION)? {
        return Ok(());
    }

    let applied_at_utc = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format sqlite schema applied timestamp")?;
    connection
        .execute(
            &format!(
                "INSERT INTO {SCHEMA_META_TABLE} (schema_version, applied_at_utc) VALUES (?1, ?2)"
            ),
            params![SQLITE_SCHEMA_VERSION, applied_at_utc],
        )
        .context("failed to write sqlite schema meta row")?;

    Ok(())
}

fn schema_meta_has_version(connection: &Connection, schema_version: &str) -> Result<bool> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {SCHEMA_META_TABLE} WHERE schema_version = ?1 LIMIT 1)"
    );
    let exists = connection
        .query_row(&query, [schema_version], |row| row.get::<usize, i64>(0))
        .context("failed to query sqlite schema version metadata")?;
    Ok(exists != 0)
}

#[derive(Debug)]
pub struct SqliteDocumentStore {
    connection: Connection,
    database: String,
}

impl SqliteDocumentStore {
    pub fn open(path: &Path, database: &str) -> Result<Self> {
        let connection = open_sqlite_connection(path)?;
        Self::from_connection(connection, database)
    }

    pub fn open_in_memory(database: &str) -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        Self::from_connection(connection, database)
    }

    pub fn from_connection(connection: Connection, database: &str) -> Result<Self> {
        ensure_sqlite_schema(&connection)?;
        Ok(Self {
            connection,
            database: database.to_string(),
        })
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn find(&self, collection: &str, key_field: &str, key: &str) -> Result<Option<Value>> {
        read_body(&self.connection, &self.database, collection, key_field, key)
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        let count = self
            .connection
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {DOCUMENTS_TABLE} WHERE database_name = ?1 AND collection = ?2"
                ),
                params![self.database, collection],
                |row| row.get::<usize, i64>(0),
            )
            .with_context(|| format!("failed to count documents in {collection}"))?;
        usize::try_from(count).map_err(|_| anyhow!("negative document count for {collection}"))
    }

    pub fn documents(&self, collection: &str) -> Result<Vec<Value>> {
        let mut statement = self
            .connection
            .prepare(&format!(
                "SELECT body_json FROM {DOCUMENTS_TABLE}
                 WHERE database_name = ?1 AND collection = ?2
                 ORDER BY key_field, natural_key"
            ))
            .context("failed to prepare sqlite collection query")?;
        let rows = statement
            .query_map(params![self.database, collection], |row| {
                row.get::<usize, String>(0)
            })
            .context("failed to execute sqlite collection query")?;

        let mut documents = Vec::new();
        for row in rows {
            let body = row.context("failed to decode sqlite document row")?;
            documents.push(decode_body(&body)?);
        }
        Ok(documents)
    }
}

impl DocumentSink for SqliteDocumentStore {
    fn upsert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        document: &TargetDocument,
    ) -> Result<WriteDisposition> {
        let incoming = document.to_json()?;
        let tx = self
            .connection
            .transaction()
            .context("failed to open sqlite transaction")?;

        let existing = read_body(&tx, &self.database, collection, key_field, key)?;
        let (merged, disposition) = match existing {
            None => (Value::Object(incoming), WriteDisposition::Inserted),
            Some(Value::Object(stored)) => {
                let merged = merge_set(stored.clone(), incoming);
                let disposition = if merged == stored {
                    WriteDisposition::Unchanged
                } else {
                    WriteDisposition::Updated
                };
                (Value::Object(merged), disposition)
            }
            Some(other) => {
                return Err(anyhow!(
                    "stored body for {key_field}={key} in {collection} is not an object: {other}"
                ));
            }
        };

        if disposition != WriteDisposition::Unchanged {
            let body = serde_json::to_string(&merged)
                .context("failed to encode sqlite document body")?;
            tx.execute(
                UPSERT_BODY_SQL,
                params![self.database, collection, key_field, key, body],
            )
            .with_context(|| format!("failed to upsert {key_field}={key} into {collection}"))?;
        }
        tx.commit()
            .context("failed to commit sqlite upsert transaction")?;

        Ok(disposition)
    }
}

// Top-level `$set` semantics.
fn merge_set(mut stored: Map<String, Value>, incoming: Map<String, Value>) -> Map<String, Value> {
    for (field, value) in incoming {
        stored.insert(field, value);
    }
    stored
}

fn read_body(
    connection: &Connection,
    database: &str,
    collection: &str,
    key_field: &str,
    key: &str,
) -> Result<Option<Value>> {
    let body = connection
        .query_row(
            SELECT_BODY_SQL,
            params![database, collection, key_field, key],
            |row| row.get::<usize, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to read {key_field}={key} from {collection}"))?;
    body.as_deref().map(decode_body).transpose()
}

fn decode_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).context("failed to decode sqlite document body")
}
