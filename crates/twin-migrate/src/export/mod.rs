use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};

use crate::models::{DocumentPath, FieldValue, Fields, SourceDocument};
use crate::store::DocumentSource;

pub const COLLECTIONS_KEY: &str = "__collections__";

// Subcollections nest under each document's `__collections__` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonExportSource {
    collections: BTreeMap<String, Vec<SourceDocument>>,
    warnings: Vec<String>,
}

impl JsonExportSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source export: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("invalid source export: {}", path.display()))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let parsed =
            serde_json::from_str::<Value>(input).context("source export must be valid JSON")?;
        Self::from_json(&parsed)
    }

    pub fn from_json(root: &Value) -> Result<Self> {
        let object = root
            .as_object()
            .ok_or_else(|| anyhow!("source export root must be an object"))?;
        let collections = match object.get(COLLECTIONS_KEY) {
            Some(wrapped) => wrapped
                .as_object()
                .ok_or_else(|| anyhow!("`{COLLECTIONS_KEY}` at export root must be an object"))?,
            None => object,
        };

        let mut source = Self::default();
        for (name, documents) in collections {
            source.load_collection(name.clone(), None, name, documents);
        }
        Ok(source)
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn collection_paths(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    fn load_collection(
        &mut self,
        collection_path: String,
        parent: Option<&DocumentPath>,
        name: &str,
        documents: &Value,
    ) {
        let Some(documents) = documents.as_object() else {
            self.warnings.push(format!(
                "{collection_path}: collection is not an object; skipped"
            ));
            return;
        };

        let mut loaded = Vec::with_capacity(documents.len());
        for (id, entry) in documents {
            let path = match parent {
                Some(parent) => parent.child(name, id),
                None => DocumentPath::root(name, id),
            };
            let data = match entry {
                Value::Null => None,
                Value::Object(object) => {
                    self.load_subcollections(&path, object);
                    Some(document_fields(object))
                }
                _ => {
                    self.warnings
                        .push(format!("{path}: document is not an object; skipped"));
                    continue;
                }
            };
            loaded.push(SourceDocument::new(id.clone(), path, data));
        }

        self.collections
            .entry(collection_path)
            .or_default()
            .extend(loaded);
    }

    fn load_subcollections(&mut self, parent: &DocumentPath, object: &Map<String, Value>) {
        let Some(subcollections) = object.get(COLLECTIONS_KEY) else {
            return;
        };
        let Some(subcollections) = subcollections.as_object() else {
            self.warnings.push(format!(
                "{parent}: `{COLLECTIONS_KEY}` is not an object; skipped"
            ));
            return;
        };
        for (name, documents) in subcollections {
            self.load_collection(parent.collection_path(name), Some(parent), name, documents);
        }
    }

    fn documents_at(&self, collection_path: &str) -> Vec<SourceDocument> {
        self.collections
            .get(collection_path)
            .cloned()
            .unwrap_or_default()
    }
}

impl DocumentSource for JsonExportSource {
    fn list_collection(&self, collection: &str) -> Result<Vec<SourceDocument>> {
        Ok(self.documents_at(collection))
    }

    fn list_subcollection(
        &self,
        parent: &DocumentPath,
        collection: &str,
    ) -> Result<Vec<SourceDocument>> {
        Ok(self.documents_at(&parent.collection_path(collection)))
    }
}

fn document_fields(object: &Map<String, Value>) -> Fields {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != COLLECTIONS_KEY)
        .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
        .collect()
}
