pub mod classifier;

use crate::models::entity::MESSAGE_TYPE_FIELD;
use crate::models::{
    Conversion, EntityKind, FieldRule, FieldValue, Fields, SourceDocument, TargetDocument,
};
use crate::utils::time::to_instant;

pub use classifier::classify_message;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub kind: EntityKind,
    pub key: String,
    pub document: TargetDocument,
}

#[must_use]
pub fn project_user(source: &SourceDocument) -> Projection {
    project(EntityKind::User, source, &[])
}

#[must_use]
pub fn project_digital_twin(source: &SourceDocument) -> Projection {
    project(EntityKind::DigitalTwin, source, &[])
}

#[must_use]
pub fn project_conversation(source: &SourceDocument, digital_twin_id: &str) -> Projection {
    project(EntityKind::Conversation, source, &[digital_twin_id])
}

#[must_use]
pub fn project_message(
    source: &SourceDocument,
    digital_twin_id: &str,
    conversation_id: &str,
) -> Projection {
    let mut projection = project(
        EntityKind::Message,
        source,
        &[digital_twin_id, conversation_id],
    );
    let message_type = classify_message(
        projection.document.get("message"),
        projection.document.get("media"),
    );
    projection
        .document
        .set(MESSAGE_TYPE_FIELD, message_type);
    projection
}

#[must_use]
pub fn project_generic(fields: &Fields) -> TargetDocument {
    let mut document = TargetDocument::new();
    for (key, value) in fields {
        if key.starts_with('_') && key != "_id" {
            continue;
        }
        let converted = if value.date_wrapper().is_some() {
            to_instant(value).map_or(FieldValue::Null, FieldValue::Instant)
        } else {
            value.clone()
        };
        document.set(key, converted);
    }
    document
}

fn project(kind: EntityKind, source: &SourceDocument, parent_ids: &[&str]) -> Projection {
    debug_assert_eq!(kind.parent_fields().len(), parent_ids.len());

    let key = resolve_key(kind, source);
    let mut document = TargetDocument::new();
    document.set(kind.key_field(), FieldValue::String(key.clone()));
    for (field, id) in kind.parent_fields().iter().zip(parent_ids) {
        document.set(field, FieldValue::string(*id));
    }
    for rule in kind.rules() {
        if let Some(value) = convert_field(rule, source) {
            document.set(rule.target, value);
        }
    }

    Projection {
        kind,
        key,
        document,
    }
}

fn resolve_key(kind: EntityKind, source: &SourceDocument) -> String {
    match source.get(kind.key_field()) {
        Some(FieldValue::String(key)) => key.clone(),
        Some(FieldValue::Integer(key)) => key.to_string(),
        None | Some(FieldValue::Null) => source.id.clone(),
        Some(other) => {
            tracing::warn!(
                kind = kind.as_str(),
                path = %source.path,
                value = ?other,
                "unusable key field; falling back to document id"
            );
            source.id.clone()
        }
    }
}

fn convert_field(rule: &FieldRule, source: &SourceDocument) -> Option<FieldValue> {
    let Some(value) = source.get(rule.source) else {
        return match rule.conversion {
            Conversion::ListOrEmpty => Some(FieldValue::Array(Vec::new())),
            _ => None,
        };
    };
    if value.is_null() {
        return None;
    }

    match rule.conversion {
        Conversion::Copy | Conversion::ListOrEmpty => Some(value.clone()),
        Conversion::Instant => to_instant(value).map(FieldValue::Instant),
        Conversion::CopyConvertingDates if value.date_wrapper().is_some() => {
            to_instant(value).map(FieldValue::Instant)
        }
        Conversion::CopyConvertingDates => Some(value.clone()),
    }
}
