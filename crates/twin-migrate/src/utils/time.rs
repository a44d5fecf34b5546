use anyhow::{Context, Result, anyhow, bail};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::models::{FieldValue, NativeTimestamp};

const EXTENDED_DATE_LEN: usize = "YYYY-MM-DD".len();

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimestampShape<'a> {
    Native(NativeTimestamp),
    Canonical(OffsetDateTime),
    DateWrapper(&'a FieldValue),
    IsoString(&'a str),
}

impl<'a> TimestampShape<'a> {
    #[must_use]
    pub fn classify(value: &'a FieldValue) -> Option<Self> {
        match value {
            FieldValue::Timestamp(native) => Some(Self::Native(*native)),
            FieldValue::Instant(instant) => Some(Self::Canonical(*instant)),
            FieldValue::Map(_) => value.date_wrapper().map(Self::DateWrapper),
            FieldValue::String(raw) => Some(Self::IsoString(raw)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::Canonical(_) => "canonical",
            Self::DateWrapper(_) => "date_wrapper",
            Self::IsoString(_) => "iso_string",
        }
    }

    pub fn to_instant(self) -> Result<OffsetDateTime> {
        let instant = match self {
            Self::Native(native) => native
                .to_datetime()
                .with_context(|| format!("native timestamp out of range: {native:?}"))?,
            Self::Canonical(instant) => instant,
            Self::DateWrapper(inner) => {
                let raw = inner
                    .as_str()
                    .ok_or_else(|| anyhow!("`$date` value must be a string, got {inner:?}"))?;
                parse_iso8601(raw)?
            }
            Self::IsoString(raw) => parse_iso8601(raw)?,
        };
        Ok(instant.to_offset(UtcOffset::UTC))
    }
}

// Parse failures are logged at debug and come back as `None`.
#[must_use]
pub fn to_instant(value: &FieldValue) -> Option<OffsetDateTime> {
    let shape = TimestampShape::classify(value)?;
    match shape.to_instant() {
        Ok(instant) => Some(instant),
        Err(error) => {
            tracing::debug!(
                shape = shape.as_str(),
                value = ?value,
                error = %format!("{error:#}"),
                "failed to parse timestamp"
            );
            None
        }
    }
}

pub fn parse_iso8601(raw: &str) -> Result<OffsetDateTime> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        bail!("timestamp input is empty");
    }

    if let Some(parsed) = parse_iso8601_variants(candidate) {
        return Ok(parsed);
    }

    // `2024-05-01 10:00:00` and other single-character separators.
    if let Some(rewritten) = with_t_separator(candidate)
        && let Some(parsed) = parse_iso8601_variants(&rewritten)
    {
        return Ok(parsed);
    }

    bail!("unsupported timestamp format: {candidate}");
}

fn parse_iso8601_variants(candidate: &str) -> Option<OffsetDateTime> {
    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return Some(parsed);
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Iso8601::DEFAULT) {
        return Some(parsed);
    }

    // Offset-less values are UTC.
    if let Ok(parsed) = PrimitiveDateTime::parse(candidate, &Iso8601::DEFAULT) {
        return Some(parsed.assume_utc());
    }

    Date::parse(candidate, &Iso8601::DEFAULT)
        .ok()
        .map(|parsed| parsed.midnight().assume_utc())
}

fn with_t_separator(candidate: &str) -> Option<String> {
    let bytes = candidate.as_bytes();
    if bytes.len() <= EXTENDED_DATE_LEN {
        return None;
    }
    let separator = bytes[EXTENDED_DATE_LEN];
    if separator == b'T' || !separator.is_ascii() || separator.is_ascii_digit() {
        return None;
    }
    if !bytes[..EXTENDED_DATE_LEN]
        .iter()
        .enumerate()
        .all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
    {
        return None;
    }

    let mut rewritten = String::with_capacity(candidate.len());
    rewritten.push_str(&candidate[..EXTENDED_DATE_LEN]);
    rewritten.push('T');
    rewritten.push_str(&candidate[EXTENDED_DATE_LEN + 1..]);
    Some(rewritten)
}

pub fn format_instant(instant: OffsetDateTime) -> Result<String> {
    instant
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .with_context(|| format!("instant cannot be rendered as RFC 3339: {instant}"))
}
