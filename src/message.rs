//! Event construction and validation.
//!
//! Each public event type has its own params struct; validation runs fully
//! before a [`Message`] is constructed, so a structurally invalid event never
//! reaches the buffer. Messages are immutable once built.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::LibraryInfo;
use crate::error::{AnalyticsError, ErrorCode, Result};

/// Fields shared by every event type.
#[derive(Debug, Clone, Default)]
pub struct CommonParams {
    pub user_id: Option<String>,
    pub anonymous_id: Option<String>,
    /// Caller-supplied message id override. Generated when absent.
    pub message_id: Option<String>,
    pub context: Option<Map<String, Value>>,
    pub integrations: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Default)]
pub struct IdentifyParams {
    pub common: CommonParams,
    pub traits: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackParams {
    pub common: CommonParams,
    pub event: String,
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupParams {
    pub common: CommonParams,
    pub group_id: String,
    pub traits: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct PageParams {
    pub common: CommonParams,
    pub name: Option<String>,
    pub category: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScreenParams {
    pub common: CommonParams,
    pub name: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct AliasParams {
    pub common: CommonParams,
    pub previous_id: String,
}

/// Type-specific payload, tagged with the wire `type` field.
///
/// Required fields are plain `String`s so required-field validation stays
/// exhaustive per variant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Identify {
        #[serde(skip_serializing_if = "Option::is_none")]
        traits: Option<Map<String, Value>>,
    },
    Track {
        event: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        traits: Option<Map<String, Value>>,
    },
    Page {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    Screen {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    Alias {
        #[serde(rename = "previousId")]
        previous_id: String,
    },
}

impl MessageBody {
    pub fn event_type(&self) -> &'static str {
        match self {
            MessageBody::Identify { .. } => "identify",
            MessageBody::Track { .. } => "track",
            MessageBody::Group { .. } => "group",
            MessageBody::Page { .. } => "page",
            MessageBody::Screen { .. } => "screen",
            MessageBody::Alias { .. } => "alias",
        }
    }
}

/// A validated, immutable event record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anonymous_id: Option<String>,
    timestamp: DateTime<Utc>,
    context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    integrations: Option<HashMap<String, bool>>,
    #[serde(flatten)]
    body: MessageBody,
}

impl Message {
    pub fn identify(params: IdentifyParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Identify {
                traits: params.traits,
            },
            library,
        )
    }

    pub fn track(params: TrackParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Track {
                event: params.event,
                properties: params.properties,
            },
            library,
        )
    }

    pub fn group(params: GroupParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Group {
                group_id: params.group_id,
                traits: params.traits,
            },
            library,
        )
    }

    pub fn page(params: PageParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Page {
                name: params.name,
                category: params.category,
                properties: params.properties,
            },
            library,
        )
    }

    pub fn screen(params: ScreenParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Screen {
                name: params.name,
                properties: params.properties,
            },
            library,
        )
    }

    pub fn alias(params: AliasParams, library: &LibraryInfo) -> Result<Self> {
        Self::build(
            params.common,
            MessageBody::Alias {
                previous_id: params.previous_id,
            },
            library,
        )
    }

    /// Validate and construct. No message exists if validation fails.
    pub fn build(common: CommonParams, body: MessageBody, library: &LibraryInfo) -> Result<Self> {
        validate(&common, &body)?;

        // Non-destructive merge: caller context keys are preserved, but the
        // library stamp always wins so attribution cannot be spoofed.
        let mut context = common.context.unwrap_or_default();
        context.insert(
            "library".to_string(),
            json!({
                "name": library.name,
                "version": library.version,
            }),
        );

        let mut message = Self {
            message_id: String::new(),
            user_id: common.user_id.filter(|id| !id.is_empty()),
            anonymous_id: common.anonymous_id.filter(|id| !id.is_empty()),
            timestamp: Utc::now(),
            context,
            integrations: common.integrations,
            body,
        };

        message.message_id = match common.message_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => message.generate_id(),
        };

        Ok(message)
    }

    /// Content-derived digest plus a random component. The digest makes ids
    /// traceable to their content; the uuid keeps ids unique even for two
    /// events built from identical parameters, since the receiving service
    /// uses them as dedup keys.
    fn generate_id(&self) -> String {
        // Serializing a Message cannot fail: all keys are strings and all
        // values are JSON-representable.
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        let digest = format!("{:x}", Sha256::digest(&encoded));
        format!("rust-{}-{}", &digest[..32], Uuid::new_v4())
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn anonymous_id(&self) -> Option<&str> {
        self.anonymous_id.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn event_type(&self) -> &'static str {
        self.body.event_type()
    }

    /// Serialized size in bytes, used by the queue's size flush threshold.
    pub(crate) fn encoded_size(&self) -> usize {
        serde_json::to_vec(self).map(|b| b.len()).unwrap_or(0)
    }
}

/// Required-field rules, keyed by event type. Absent identity fields are
/// genuinely absent: an empty string never satisfies the identity rule.
fn validate(common: &CommonParams, body: &MessageBody) -> Result<()> {
    let has_user = common.user_id.as_deref().is_some_and(|id| !id.is_empty());
    let has_anonymous = common
        .anonymous_id
        .as_deref()
        .is_some_and(|id| !id.is_empty());

    if !has_user && !has_anonymous {
        return Err(AnalyticsError::validation_error(
            ErrorCode::ValidationMissingIdentity,
            "Either userId or anonymousId is required",
        ));
    }

    match body {
        MessageBody::Track { event, .. } if event.is_empty() => {
            Err(AnalyticsError::validation_error(
                ErrorCode::ValidationEmptyEvent,
                "track requires a non-empty event name",
            ))
        }
        MessageBody::Group { group_id, .. } if group_id.is_empty() => {
            Err(AnalyticsError::validation_error(
                ErrorCode::ValidationEmptyGroupId,
                "group requires a non-empty groupId",
            ))
        }
        MessageBody::Alias { previous_id, .. } if previous_id.is_empty() => {
            Err(AnalyticsError::validation_error(
                ErrorCode::ValidationEmptyPreviousId,
                "alias requires a non-empty previousId",
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> LibraryInfo {
        LibraryInfo::default()
    }

    fn with_user(user_id: &str) -> CommonParams {
        CommonParams {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_identity_rejected() {
        let err = Message::identify(IdentifyParams::default(), &library()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationMissingIdentity);
    }

    #[test]
    fn test_empty_identity_rejected() {
        // An empty string is not an identity.
        let params = IdentifyParams {
            common: CommonParams {
                user_id: Some(String::new()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = Message::identify(params, &library()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationMissingIdentity);
    }

    #[test]
    fn test_anonymous_id_alone_is_enough() {
        let params = IdentifyParams {
            common: CommonParams {
                anonymous_id: Some("anon-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let message = Message::identify(params, &library()).unwrap();
        assert_eq!(message.anonymous_id(), Some("anon-1"));
        assert!(message.user_id().is_none());
    }

    #[test]
    fn test_track_requires_event() {
        let params = TrackParams {
            common: with_user("u1"),
            ..Default::default()
        };
        let err = Message::track(params, &library()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationEmptyEvent);
    }

    #[test]
    fn test_group_requires_group_id() {
        let params = GroupParams {
            common: with_user("u1"),
            ..Default::default()
        };
        let err = Message::group(params, &library()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationEmptyGroupId);
    }

    #[test]
    fn test_alias_requires_previous_id() {
        let params = AliasParams {
            common: with_user("u1"),
            ..Default::default()
        };
        let err = Message::alias(params, &library()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationEmptyPreviousId);
    }

    #[test]
    fn test_identical_params_distinct_ids() {
        let params = TrackParams {
            common: with_user("u1"),
            event: "Signed Up".to_string(),
            ..Default::default()
        };
        let a = Message::track(params.clone(), &library()).unwrap();
        let b = Message::track(params, &library()).unwrap();
        assert_ne!(a.message_id(), b.message_id());
        assert!(a.message_id().starts_with("rust-"));
    }

    #[test]
    fn test_caller_message_id_honored() {
        let params = TrackParams {
            common: CommonParams {
                user_id: Some("u1".to_string()),
                message_id: Some("custom-id".to_string()),
                ..Default::default()
            },
            event: "Signed Up".to_string(),
            ..Default::default()
        };
        let message = Message::track(params, &library()).unwrap();
        assert_eq!(message.message_id(), "custom-id");
    }

    #[test]
    fn test_context_merge_preserves_caller_keys() {
        let mut caller_context = Map::new();
        caller_context.insert("ip".to_string(), json!("10.1.2.3"));
        caller_context.insert("library".to_string(), json!("spoofed"));

        let params = IdentifyParams {
            common: CommonParams {
                user_id: Some("u1".to_string()),
                context: Some(caller_context),
                ..Default::default()
            },
            ..Default::default()
        };
        let message = Message::identify(params, &library()).unwrap();

        assert_eq!(message.context()["ip"], json!("10.1.2.3"));
        // Library attribution always wins over caller input.
        assert_eq!(message.context()["library"]["name"], json!(crate::SDK_NAME));
        assert_eq!(
            message.context()["library"]["version"],
            json!(crate::SDK_VERSION)
        );
    }

    #[test]
    fn test_wire_format() {
        let mut properties = Map::new();
        properties.insert("plan".to_string(), json!("pro"));

        let params = TrackParams {
            common: with_user("u1"),
            event: "Signed Up".to_string(),
            properties: Some(properties),
        };
        let message = Message::track(params, &library()).unwrap();
        let wire = serde_json::to_value(&message).unwrap();

        assert_eq!(wire["type"], json!("track"));
        assert_eq!(wire["userId"], json!("u1"));
        assert_eq!(wire["event"], json!("Signed Up"));
        assert_eq!(wire["properties"]["plan"], json!("pro"));
        assert!(wire.get("anonymousId").is_none());
        assert!(wire.get("integrations").is_none());
        assert!(wire.get("messageId").is_some());
        assert!(wire.get("timestamp").is_some());
    }

    #[test]
    fn test_wire_format_renamed_fields() {
        let group = Message::group(
            GroupParams {
                common: with_user("u1"),
                group_id: "g1".to_string(),
                ..Default::default()
            },
            &library(),
        )
        .unwrap();
        let wire = serde_json::to_value(&group).unwrap();
        assert_eq!(wire["type"], json!("group"));
        assert_eq!(wire["groupId"], json!("g1"));

        let alias = Message::alias(
            AliasParams {
                common: with_user("u1"),
                previous_id: "old-id".to_string(),
            },
            &library(),
        )
        .unwrap();
        let wire = serde_json::to_value(&alias).unwrap();
        assert_eq!(wire["type"], json!("alias"));
        assert_eq!(wire["previousId"], json!("old-id"));
    }

    #[test]
    fn test_event_type_names() {
        let page = Message::page(
            PageParams {
                common: with_user("u1"),
                name: Some("Home".to_string()),
                category: Some("Docs".to_string()),
                ..Default::default()
            },
            &library(),
        )
        .unwrap();
        assert_eq!(page.event_type(), "page");

        let screen = Message::screen(
            ScreenParams {
                common: with_user("u1"),
                name: Some("Main".to_string()),
                ..Default::default()
            },
            &library(),
        )
        .unwrap();
        assert_eq!(screen.event_type(), "screen");
    }

    #[test]
    fn test_encoded_size_nonzero() {
        let message = Message::identify(
            IdentifyParams {
                common: with_user("u1"),
                ..Default::default()
            },
            &library(),
        )
        .unwrap();
        assert!(message.encoded_size() > 0);
    }
}
