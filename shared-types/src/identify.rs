use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

/// Inbound observation for `POST /identify`.
///
/// `phoneNumber` is accepted either as a JSON string or a JSON integer;
/// integers are kept in their decimal string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_phone_number")]
    pub phone_number: Option<String>,
}

impl IdentifyRequest {
    pub fn new(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_string),
            phone_number: phone_number.map(str::to_string),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneNumberValue {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_phone_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PhoneNumberValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PhoneNumberValue::Text(s)) => Ok(Some(s)),
        Some(PhoneNumberValue::Number(n)) if n.is_i64() || n.is_u64() => Ok(Some(n.to_string())),
        Some(PhoneNumberValue::Number(n)) => Err(D::Error::custom(format!(
            "phoneNumber must be a string or an integer, got {n}"
        ))),
    }
}

/// The consolidated identity a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedContact {
    pub primary_contact_id: i64,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IdentifyResponse {
    pub contact: ConsolidatedContact,
}
