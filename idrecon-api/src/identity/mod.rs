//! Identity-graph consolidation.
//!
//! An observation (email and/or phone number) is matched against stored
//! contacts, expanded into its full linked group, merged down to a single
//! oldest primary, extended with a new secondary when it carries unseen
//! values, and finally projected into the response document.

pub mod consolidator;
pub mod error;
pub mod graph;
pub mod projector;

use shared_types::{Contact, IdentifyRequest, IdentifyResponse};

pub use consolidator::resolve;
pub use error::IdentityError;
pub use graph::ContactGroup;

/// A validated inbound observation. Empty strings count as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<'a> {
    pub email: Option<&'a str>,
    pub phone_number: Option<&'a str>,
}

impl<'a> Observation<'a> {
    pub fn new(email: Option<&'a str>, phone_number: Option<&'a str>) -> Result<Self, IdentityError> {
        let email = email.filter(|e| !e.is_empty());
        let phone_number = phone_number.filter(|p| !p.is_empty());

        if email.is_none() && phone_number.is_none() {
            return Err(IdentityError::Validation(
                "email or phoneNumber required".to_string(),
            ));
        }

        Ok(Self {
            email,
            phone_number,
        })
    }

    pub fn from_request(request: &'a IdentifyRequest) -> Result<Self, IdentityError> {
        Self::new(request.email.as_deref(), request.phone_number.as_deref())
    }
}

/// The elected primary and the consolidated group it heads.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub primary: Contact,
    pub group: ContactGroup,
}

impl Resolution {
    pub fn into_response(self) -> IdentifyResponse {
        IdentifyResponse {
            contact: projector::project(&self.primary, &self.group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_requires_a_value() {
        let result = Observation::new(None, None);
        assert!(matches!(result, Err(IdentityError::Validation(_))));

        let result = Observation::new(Some(""), Some(""));
        assert!(matches!(result, Err(IdentityError::Validation(_))));
    }

    #[test]
    fn test_observation_drops_empty_values() {
        let observation = Observation::new(Some(""), Some("123456")).unwrap();
        assert_eq!(observation.email, None);
        assert_eq!(observation.phone_number, Some("123456"));
    }

    #[test]
    fn test_observation_keeps_raw_values() {
        let observation = Observation::new(Some(" Doc@HillValley.edu"), None).unwrap();
        assert_eq!(observation.email, Some(" Doc@HillValley.edu"));
    }
}
