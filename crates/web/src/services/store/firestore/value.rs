//! Firestore REST value encoding.
//!
//! Firestore's JSON wire format tags every value with its type
//! (`{"stringValue": "O+"}`, `{"integerValue": "42"}`, ...). [`Value`] mirrors
//! that format and converts to and from [`FieldValue`].

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::super::{Document, FieldValue, Fields, StoreError};

/// A Firestore value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64, encoded as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 timestamp.
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// A document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    /// Full resource name, `projects/.../documents/<collection>/<id>`.
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// Request body for creating a document.
#[derive(Debug, Serialize)]
pub struct NewDocument {
    pub fields: BTreeMap<String, Value>,
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => Self::NullValue(()),
            FieldValue::Bool(b) => Self::BooleanValue(*b),
            FieldValue::Integer(i) => Self::IntegerValue(i.to_string()),
            FieldValue::Double(d) => Self::DoubleValue(*d),
            FieldValue::String(s) => Self::StringValue(s.clone()),
            FieldValue::Timestamp(ts) => {
                Self::TimestampValue(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::Bytes(b) => Self::BytesValue(b.clone()),
            FieldValue::Reference(r) => Self::ReferenceValue(r.clone()),
            FieldValue::GeoPoint {
                latitude,
                longitude,
            } => Self::GeoPointValue(LatLng {
                latitude: *latitude,
                longitude: *longitude,
            }),
            FieldValue::Array(values) => Self::ArrayValue(ArrayValue {
                values: values.iter().map(Self::from).collect(),
            }),
            FieldValue::Map(fields) => Self::MapValue(MapValue {
                fields: encode_fields(fields),
            }),
        }
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::NullValue(()) => Self::Null,
            Value::BooleanValue(b) => Self::Bool(b),
            Value::IntegerValue(s) => Self::Integer(
                s.parse()
                    .map_err(|e| StoreError::Parse(format!("integerValue '{s}': {e}")))?,
            ),
            Value::DoubleValue(d) => Self::Double(d),
            Value::TimestampValue(s) => Self::Timestamp(
                DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| StoreError::Parse(format!("timestampValue '{s}': {e}")))?
                    .with_timezone(&Utc),
            ),
            Value::StringValue(s) => Self::String(s),
            Value::BytesValue(b) => Self::Bytes(b),
            Value::ReferenceValue(r) => Self::Reference(r),
            Value::GeoPointValue(LatLng {
                latitude,
                longitude,
            }) => Self::GeoPoint {
                latitude,
                longitude,
            },
            Value::ArrayValue(array) => Self::Array(
                array
                    .values
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::MapValue(map) => Self::Map(decode_fields(map.fields)?),
        })
    }
}

/// Encode fields for a request body.
#[must_use]
pub fn encode_fields(fields: &Fields) -> BTreeMap<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(value)))
        .collect()
}

/// Decode fields from a response body.
///
/// # Errors
///
/// Returns `StoreError::Parse` if an integer or timestamp is malformed.
pub fn decode_fields(fields: BTreeMap<String, Value>) -> Result<Fields, StoreError> {
    fields
        .into_iter()
        .map(|(name, value)| Ok((name, FieldValue::try_from(value)?)))
        .collect()
}

impl TryFrom<RawDocument> for Document {
    type Error = StoreError;

    fn try_from(raw: RawDocument) -> Result<Self, Self::Error> {
        let id = raw
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Parse(format!("document name '{}'", raw.name)))?
            .to_string();
        Ok(Self {
            id,
            fields: decode_fields(raw.fields)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_value_wire_format() {
        let fields: Fields = [
            ("name".to_string(), FieldValue::from("Asha")),
            ("age".to_string(), FieldValue::Integer(31)),
            ("active".to_string(), FieldValue::Bool(true)),
            ("note".to_string(), FieldValue::Null),
        ]
        .into_iter()
        .collect();

        let body = serde_json::to_value(NewDocument {
            fields: encode_fields(&fields),
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "fields": {
                    "active": {"booleanValue": true},
                    "age": {"integerValue": "31"},
                    "name": {"stringValue": "Asha"},
                    "note": {"nullValue": null}
                }
            })
        );
    }

    #[test]
    fn test_decode_document() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/donors/Qk3mX9aLr2",
            "fields": {
                "group": {"stringValue": "O+"},
                "createdAt": {"timestampValue": "2025-11-02T08:15:00.123Z"},
                "tags": {"arrayValue": {"values": [{"stringValue": "rare"}]}},
                "address": {"mapValue": {"fields": {"pin": {"integerValue": "400001"}}}},
                "empty": {"arrayValue": {}}
            },
            "createTime": "2025-11-02T08:15:00.123456Z",
            "updateTime": "2025-11-02T08:15:00.123456Z"
        }))
        .unwrap();

        let doc = Document::try_from(raw).unwrap();
        assert_eq!(doc.id, "Qk3mX9aLr2");
        assert_eq!(doc.str_field("group"), Some("O+"));
        assert_eq!(
            doc.fields.get("createdAt"),
            Some(&FieldValue::Timestamp(
                Utc.with_ymd_and_hms(2025, 11, 2, 8, 15, 0).unwrap()
                    + chrono::Duration::milliseconds(123)
            ))
        );
        assert_eq!(
            doc.fields.get("tags"),
            Some(&FieldValue::Array(vec![FieldValue::from("rare")]))
        );
        assert_eq!(doc.fields.get("empty"), Some(&FieldValue::Array(vec![])));
        let Some(FieldValue::Map(address)) = doc.fields.get("address") else {
            panic!("address should decode as a map");
        };
        assert_eq!(address.get("pin"), Some(&FieldValue::Integer(400_001)));
    }

    #[test]
    fn test_document_without_fields() {
        let raw: RawDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/donors/abc"
        }))
        .unwrap();
        let doc = Document::try_from(raw).unwrap();
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn test_malformed_integer_is_parse_error() {
        let result = FieldValue::try_from(Value::IntegerValue("12x".to_string()));
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[test]
    fn test_timestamp_round_trip_format() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        assert_eq!(
            Value::from(&FieldValue::Timestamp(ts)),
            Value::TimestampValue("2026-01-05T10:00:00Z".to_string())
        );
    }
}
