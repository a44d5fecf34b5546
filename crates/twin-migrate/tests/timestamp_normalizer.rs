use serde_json::json;
use time::{OffsetDateTime, UtcOffset};
use twin_migrate::models::{FieldValue, NativeTimestamp};
use twin_migrate::utils::time::{format_instant, to_instant};

const MAY_FIRST_TEN_UTC: i64 = 1_714_557_600;

fn expected() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(MAY_FIRST_TEN_UTC).expect("fixture instant is valid")
}

#[test]
fn all_supported_shapes_normalize_to_the_same_instant() {
    let wrapped = FieldValue::from_json(&json!({ "$date": "2024-05-01T10:00:00Z" }));
    let native = FieldValue::Timestamp(NativeTimestamp {
        seconds: MAY_FIRST_TEN_UTC,
        nanos: 0,
    });
    let exported = FieldValue::from_json(&json!({
        "__datatype__": "timestamp",
        "value": { "_seconds": MAY_FIRST_TEN_UTC, "_nanoseconds": 0 }
    }));
    let plain = FieldValue::string("2024-05-01T10:00:00Z");
    let offset = FieldValue::string("2024-05-01T12:00:00+02:00");
    let space_separated = FieldValue::string("2024-05-01 10:00:00");
    let space_separated_offset = FieldValue::string("2024-05-01 10:00:00+00:00");
    let wrapped_space_separated =
        FieldValue::from_json(&json!({ "$date": "2024-05-01 10:00:00" }));
    let canonical = FieldValue::Instant(expected());

    for value in [
        wrapped,
        native,
        exported,
        plain,
        offset,
        space_separated,
        space_separated_offset,
        wrapped_space_separated,
        canonical,
    ] {
        assert_eq!(to_instant(&value), Some(expected()), "shape {value:?}");
    }
}

#[test]
fn fractional_seconds_survive_normalization() {
    let native = FieldValue::Timestamp(NativeTimestamp {
        seconds: MAY_FIRST_TEN_UTC,
        nanos: 250_000_000,
    });
    let plain = FieldValue::string("2024-05-01T10:00:00.25Z");

    let from_native = to_instant(&native).expect("native should convert");
    assert_eq!(to_instant(&plain), Some(from_native));
    assert_eq!(
        format_instant(from_native).expect("should format"),
        "2024-05-01T10:00:00.25Z"
    );
}

#[test]
fn canonical_instants_are_reported_in_utc() {
    let plus_two = UtcOffset::from_hms(2, 0, 0).expect("offset is valid");
    let shifted = FieldValue::Instant(expected().to_offset(plus_two));

    let normalized = to_instant(&shifted).expect("canonical passes through");
    assert_eq!(normalized, expected());
    assert!(normalized.offset().is_utc());
}

#[test]
fn unparseable_inputs_are_absent_instead_of_errors() {
    let inputs = [
        FieldValue::string("yesterday"),
        FieldValue::string(""),
        FieldValue::from_json(&json!({ "$date": "31/12/2024" })),
        FieldValue::from_json(&json!({ "$date": null })),
        FieldValue::Null,
        FieldValue::Bool(true),
        FieldValue::Integer(MAY_FIRST_TEN_UTC),
        FieldValue::from_json(&json!({ "seconds": 1 })),
    ];

    for value in inputs {
        assert_eq!(to_instant(&value), None, "value {value:?}");
    }
}
