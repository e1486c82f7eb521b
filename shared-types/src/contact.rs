use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl LinkPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPrecedence::Primary => "primary",
            LinkPrecedence::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown link precedence: {0}")]
pub struct ParseLinkPrecedenceError(pub String);

impl FromStr for LinkPrecedence {
    type Err = ParseLinkPrecedenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(LinkPrecedence::Primary),
            "secondary" => Ok(LinkPrecedence::Secondary),
            other => Err(ParseLinkPrecedenceError(other.to_string())),
        }
    }
}

/// A single observation of a customer identity.
///
/// Secondaries carry `linked_id` pointing at their primary; primaries never do.
/// Timestamps are Unix milliseconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<i64>,
    pub link_precedence: LinkPrecedence,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    /// Sort key for "oldest wins". Ids are handed out in insertion order, so
    /// they settle records created within the same millisecond.
    pub fn age_key(&self) -> (i64, i64) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_precedence_serialization() {
        let json = serde_json::to_string(&LinkPrecedence::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");

        let parsed: LinkPrecedence = "primary".parse().unwrap();
        assert_eq!(parsed, LinkPrecedence::Primary);
        assert!("Primary".parse::<LinkPrecedence>().is_err());
    }

    #[test]
    fn test_contact_uses_camel_case() {
        let contact = Contact {
            id: 7,
            email: Some("doc@hillvalley.edu".to_string()),
            phone_number: None,
            linked_id: Some(1),
            link_precedence: LinkPrecedence::Secondary,
            created_at: 10,
            updated_at: 10,
            deleted_at: None,
        };

        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(value["phoneNumber"], serde_json::Value::Null);
        assert_eq!(value["linkedId"], 1);
        assert_eq!(value["linkPrecedence"], "secondary");
    }
}
