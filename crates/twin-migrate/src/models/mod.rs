pub mod document;
pub mod entity;

pub use document::{
    DATE_WRAPPER_KEY, DocumentPath, FieldValue, Fields, NativeTimestamp, SourceDocument,
    TargetDocument,
};
pub use entity::{Conversion, EntityKind, FieldRule, all_entity_kinds};
