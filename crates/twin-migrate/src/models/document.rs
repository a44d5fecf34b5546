use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use anyhow::Result;
use serde_json::{Map, Number, Value, json};
use time::OffsetDateTime;

use crate::utils::time::format_instant;

pub const DATE_WRAPPER_KEY: &str = "$date";
pub const EXPORT_DATATYPE_KEY: &str = "__datatype__";
pub const EXPORT_TIMESTAMP_DATATYPE: &str = "timestamp";
pub const NATIVE_SECONDS_KEY: &str = "_seconds";
pub const NATIVE_NANOS_KEY: &str = "_nanoseconds";

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl NativeTimestamp {
    pub fn to_datetime(self) -> Result<OffsetDateTime, time::error::ComponentRange> {
        let total_nanos = i128::from(self.seconds) * 1_000_000_000 + i128::from(self.nanos);
        OffsetDateTime::from_unix_timestamp_nanos(total_nanos)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(NativeTimestamp),
    Instant(OffsetDateTime),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Double(value) => *value != 0.0,
            Self::String(value) => !value.is_empty(),
            Self::Timestamp(_) | Self::Instant(_) => true,
            Self::Array(values) => !values.is_empty(),
            Self::Map(fields) => !fields.is_empty(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    #[must_use]
    pub fn date_wrapper(&self) -> Option<&FieldValue> {
        self.as_map()
            .and_then(|fields| fields.get(DATE_WRAPPER_KEY))
    }

    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(*value),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Double))
                .unwrap_or(Self::Null),
            Value::String(value) => Self::String(value.clone()),
            Value::Array(values) => Self::Array(values.iter().map(Self::from_json).collect()),
            Value::Object(object) => native_timestamp_from_json(object)
                .map(Self::Timestamp)
                .unwrap_or_else(|| {
                    Self::Map(
                        object
                            .iter()
                            .map(|(key, value)| (key.clone(), Self::from_json(value)))
                            .collect(),
                    )
                }),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Integer(value) => Value::Number(Number::from(*value)),
            Self::Double(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Self::String(value) => Value::String(value.clone()),
            Self::Timestamp(native) => match native.to_datetime() {
                Ok(instant) => json!({ DATE_WRAPPER_KEY: format_instant(instant)? }),
                Err(_) => json!({
                    NATIVE_SECONDS_KEY: native.seconds,
                    NATIVE_NANOS_KEY: native.nanos,
                }),
            },
            Self::Instant(instant) => json!({ DATE_WRAPPER_KEY: format_instant(*instant)? }),
            Self::Array(values) => Value::Array(
                values
                    .iter()
                    .map(FieldValue::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(fields) => Value::Object(fields_to_json(fields)?),
        })
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<OffsetDateTime> for FieldValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Instant(value)
    }
}

pub fn fields_to_json(fields: &Fields) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for (key, value) in fields {
        object.insert(key.clone(), value.to_json()?);
    }
    Ok(object)
}

// Export tools write timestamps either as a tagged datatype or as the bare
// `{_seconds, _nanoseconds}` pair.
fn native_timestamp_from_json(object: &Map<String, Value>) -> Option<NativeTimestamp> {
    let pair = match object.get(EXPORT_DATATYPE_KEY).and_then(Value::as_str) {
        Some(EXPORT_TIMESTAMP_DATATYPE) => object.get("value")?.as_object()?,
        Some(_) => return None,
        None if object.len() == 2 => object,
        None => return None,
    };
    let seconds = pair.get(NATIVE_SECONDS_KEY)?.as_i64()?;
    let nanos = u32::try_from(pair.get(NATIVE_NANOS_KEY)?.as_u64()?).ok()?;
    Some(NativeTimestamp { seconds, nanos })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    #[must_use]
    pub fn root(collection: &str, id: &str) -> Self {
        Self(format!("{collection}/{id}"))
    }

    #[must_use]
    pub fn child(&self, collection: &str, id: &str) -> Self {
        Self(format!("{}/{collection}/{id}", self.0))
    }

    #[must_use]
    pub fn collection_path(&self, collection: &str) -> String {
        format!("{}/{collection}", self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: String,
    pub path: DocumentPath,
    pub data: Option<Fields>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, path: DocumentPath, data: Option<Fields>) -> Self {
        Self {
            id: id.into(),
            path,
            data,
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.data.as_ref().and_then(|data| data.get(field))
    }

    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.get(field).is_some_and(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetDocument {
    fields: Fields,
}

impl TargetDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Null removes the field.
    pub fn set(&mut self, field: &str, value: FieldValue) {
        if value.is_null() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Result<Map<String, Value>> {
        fields_to_json(&self.fields)
    }
}
