use crate::models::FieldValue;

pub const TEXT_TYPE: &str = "text";
pub const MEDIA_TYPE: &str = "media";

#[must_use]
pub fn classify_message(message: Option<&FieldValue>, media: Option<&FieldValue>) -> FieldValue {
    let has_text = message.is_some_and(FieldValue::is_truthy);
    let has_media = media.is_some_and(FieldValue::is_truthy);

    if has_text && !has_media {
        return FieldValue::string(TEXT_TYPE);
    }
    if let Some(media) = media.filter(|media| media.is_truthy()) {
        return first_entry_type(media)
            .cloned()
            .unwrap_or_else(|| FieldValue::string(MEDIA_TYPE));
    }
    FieldValue::string(TEXT_TYPE)
}

fn first_entry_type(media: &FieldValue) -> Option<&FieldValue> {
    media
        .as_array()?
        .first()?
        .as_map()?
        .get("type")
        .filter(|kind| kind.is_truthy())
}
