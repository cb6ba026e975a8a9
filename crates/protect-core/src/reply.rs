//! Response payloads for the request-handling layer.

use crate::errors::RegistryError;
use crate::model::{ProtectionId, ProtectionRecord};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Fixed human-readable timestamp pattern (UTC).
pub const TIMESTAMP_FORMAT: &str = "%m-%d-%Y, %H:%M:%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetResult {
    Ok,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetReply {
    #[serde(rename = "ID")]
    pub id: ProtectionId,
    pub result: SetResult,
}

/// Live records keyed by id, serialized in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReply(pub Vec<ProtectionRecord>);

#[derive(Serialize)]
struct PullEntry {
    #[serde(rename = "DEFENSE")]
    defense: u8,
    #[serde(rename = "START_PROTECTION")]
    start: String,
    #[serde(rename = "END_PROTECTION")]
    end: String,
}

impl Serialize for PullReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rec in &self.0 {
            map.serialize_entry(
                &rec.id.0.to_string(),
                &PullEntry {
                    defense: rec.defense.get(),
                    start: format_timestamp(rec.start),
                    end: format_timestamp(rec.end),
                },
            )?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidReply {
    pub json_path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableReply {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Set(SetReply),
    Pull(PullReply),
    Invalid(InvalidReply),
    Unavailable(UnavailableReply),
}

impl Reply {
    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            Reply::Set(_) | Reply::Pull(_) => 200,
            Reply::Invalid(_) => 400,
            Reply::Unavailable(_) => 503,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":"failed to encode reply: {}"}}"#, e.to_string().replace('"', "'"))
        })
    }
}

impl From<RegistryError> for Reply {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::InvalidInput { json_path, reason } => Reply::Invalid(InvalidReply {
                json_path,
                error: reason,
            }),
            RegistryError::DuplicateId { id } => Reply::Set(SetReply {
                id,
                result: SetResult::Duplicate,
            }),
            RegistryError::StoreUnavailable(msg) => {
                Reply::Unavailable(UnavailableReply { error: msg })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DefenseLevel, Ttl};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2023, 7, 4, 9, 5, 3).unwrap();
        assert_eq!(format_timestamp(ts), "07-04-2023, 09:05:03");
    }

    #[test]
    fn test_set_reply_shape() {
        let ok = Reply::Set(SetReply {
            id: ProtectionId(5),
            result: SetResult::Ok,
        });
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"ID": 5, "result": "ok"}));
        assert_eq!(ok.status(), 200);

        let dup = Reply::from(RegistryError::DuplicateId { id: ProtectionId(5) });
        assert_eq!(
            serde_json::to_value(&dup).unwrap(),
            json!({"ID": 5, "result": "duplicate"})
        );
    }

    #[test]
    fn test_pull_reply_keeps_numeric_order() {
        let t = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let rec = |id: i64| {
            ProtectionRecord::new(
                ProtectionId(id),
                DefenseLevel::new(2).unwrap(),
                Ttl::from_secs(60).unwrap(),
                t,
            )
        };
        let reply = Reply::Pull(PullReply(vec![rec(2), rec(10), rec(100)]));
        let text = reply.to_json();

        let p2 = text.find("\"2\"").unwrap();
        let p10 = text.find("\"10\"").unwrap();
        let p100 = text.find("\"100\"").unwrap();
        assert!(p2 < p10 && p10 < p100, "unexpected order: {text}");

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value["10"],
            json!({
                "DEFENSE": 2,
                "START_PROTECTION": "01-02-2023, 03:04:05",
                "END_PROTECTION": "01-02-2023, 03:05:05"
            })
        );
    }

    #[test]
    fn test_error_replies() {
        let invalid = Reply::from(RegistryError::invalid_input("$.TTL", "too big"));
        assert_eq!(invalid.status(), 400);
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({"json_path": "$.TTL", "error": "too big"})
        );

        let down = Reply::from(RegistryError::StoreUnavailable("disk gone".to_string()));
        assert_eq!(down.status(), 503);
        assert_eq!(serde_json::to_value(&down).unwrap(), json!({"error": "disk gone"}));
    }

    #[test]
    fn test_empty_pull_is_empty_object() {
        assert_eq!(Reply::Pull(PullReply(Vec::new())).to_json(), "{}");
    }
}
