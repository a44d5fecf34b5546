use anyhow::Result;

use crate::models::{DocumentPath, SourceDocument, TargetDocument};

pub trait DocumentSource {
    fn list_collection(&self, collection: &str) -> Result<Vec<SourceDocument>>;

    fn list_subcollection(
        &self,
        parent: &DocumentPath,
        collection: &str,
    ) -> Result<Vec<SourceDocument>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    Inserted,
    Updated,
    Unchanged,
}

impl WriteDisposition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

// `upsert` is atomic per call: insert when nothing matches `key_field == key`,
// otherwise overwrite only the fields present in `document`.
pub trait DocumentSink {
    fn upsert(
        &mut self,
        collection: &str,
        key_field: &str,
        key: &str,
        document: &TargetDocument,
    ) -> Result<WriteDisposition>;
}
