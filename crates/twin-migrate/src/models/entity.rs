use serde::Serialize;

pub const USERS_COLLECTION: &str = "users";
pub const DIGITAL_TWINS_COLLECTION: &str = "digital_twins";
pub const CONVERSATIONS_COLLECTION: &str = "conversations";
pub const MESSAGES_COLLECTION: &str = "messages";
pub const MESSAGES_TARGET_COLLECTION: &str = "avatar_conversations";

pub const DIGITAL_TWIN_ID_FIELD: &str = "digital_twin_id";
pub const CONVERSATION_ID_FIELD: &str = "conversation_id";
pub const MESSAGE_TYPE_FIELD: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    DigitalTwin,
    Conversation,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Copy,
    Instant,
    CopyConvertingDates,
    ListOrEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub target: &'static str,
    pub source: &'static str,
    pub conversion: Conversion,
}

const fn same(name: &'static str, conversion: Conversion) -> FieldRule {
    FieldRule {
        target: name,
        source: name,
        conversion,
    }
}

const fn renamed(target: &'static str, source: &'static str, conversion: Conversion) -> FieldRule {
    FieldRule {
        target,
        source,
        conversion,
    }
}

const USER_RULES: &[FieldRule] = &[
    same("username", Conversion::Copy),
    same("email", Conversion::Copy),
    same("created_at", Conversion::Instant),
    same("last_login", Conversion::Instant),
    same("currently_logged_in", Conversion::Copy),
    same("digital_twins", Conversion::Copy),
    same("last_used_digital_twin", Conversion::Copy),
];

const DIGITAL_TWIN_RULES: &[FieldRule] = &[
    same("user_id", Conversion::Copy),
    same("name", Conversion::Copy),
    same("description", Conversion::Copy),
    same("created_at", Conversion::Instant),
    same("icon", Conversion::Copy),
    same("reference_audio", Conversion::Copy),
    same("files", Conversion::Copy),
    same("system_prompt_reference_image_description", Conversion::Copy),
    same("system_prompt_reference_audio_description", Conversion::Copy),
    same("system_prompt_description", Conversion::Copy),
    same("default_conversation", Conversion::Copy),
];

const CONVERSATION_RULES: &[FieldRule] = &[
    same("summary", Conversion::CopyConvertingDates),
    same("created_at", Conversion::Instant),
    same("updated_at", Conversion::Instant),
    same("message_count", Conversion::CopyConvertingDates),
];

const MESSAGE_RULES: &[FieldRule] = &[
    renamed("sender", "role", Conversion::Copy),
    renamed("message", "content", Conversion::Copy),
    same("media", Conversion::ListOrEmpty),
    same("timestamp", Conversion::Instant),
];

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::DigitalTwin => "digital_twins",
            Self::Conversation => "conversations",
            Self::Message => "messages",
        }
    }

    #[must_use]
    pub const fn source_collection(self) -> &'static str {
        match self {
            Self::User => USERS_COLLECTION,
            Self::DigitalTwin => DIGITAL_TWINS_COLLECTION,
            Self::Conversation => CONVERSATIONS_COLLECTION,
            Self::Message => MESSAGES_COLLECTION,
        }
    }

    #[must_use]
    pub const fn target_collection(self) -> &'static str {
        match self {
            Self::User => USERS_COLLECTION,
            Self::DigitalTwin => DIGITAL_TWINS_COLLECTION,
            Self::Conversation => CONVERSATIONS_COLLECTION,
            Self::Message => MESSAGES_TARGET_COLLECTION,
        }
    }

    #[must_use]
    pub const fn key_field(self) -> &'static str {
        match self {
            Self::User => "user_id",
            Self::DigitalTwin => DIGITAL_TWIN_ID_FIELD,
            Self::Conversation => CONVERSATION_ID_FIELD,
            Self::Message => "message_id",
        }
    }

    #[must_use]
    pub const fn parent_fields(self) -> &'static [&'static str] {
        match self {
            Self::User | Self::DigitalTwin => &[],
            Self::Conversation => &[DIGITAL_TWIN_ID_FIELD],
            Self::Message => &[DIGITAL_TWIN_ID_FIELD, CONVERSATION_ID_FIELD],
        }
    }

    #[must_use]
    pub const fn rules(self) -> &'static [FieldRule] {
        match self {
            Self::User => USER_RULES,
            Self::DigitalTwin => DIGITAL_TWIN_RULES,
            Self::Conversation => CONVERSATION_RULES,
            Self::Message => MESSAGE_RULES,
        }
    }

    #[must_use]
    pub const fn derived_fields(self) -> &'static [&'static str] {
        match self {
            Self::Message => &[MESSAGE_TYPE_FIELD],
            _ => &[],
        }
    }

    #[must_use]
    pub fn allowlist(self) -> Vec<&'static str> {
        let mut fields = vec![self.key_field()];
        fields.extend_from_slice(self.parent_fields());
        fields.extend(self.rules().iter().map(|rule| rule.target));
        fields.extend_from_slice(self.derived_fields());
        fields
    }
}

#[must_use]
pub const fn all_entity_kinds() -> [EntityKind; 4] {
    [
        EntityKind::User,
        EntityKind::DigitalTwin,
        EntityKind::Conversation,
        EntityKind::Message,
    ]
}
