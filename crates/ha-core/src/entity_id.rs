//! `domain.object_id` entity identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("invalid domain '{0}'")]
    InvalidDomain(String),

    #[error("invalid object_id '{0}'")]
    InvalidObjectId(String),
}

/// An entity identifier such as `binary_sensor.octoprint_printing`
///
/// Both halves are lowercase ASCII alphanumerics and underscores, never
/// starting or ending with an underscore. The domain additionally may not
/// contain `__`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if domain.contains("__") || !is_slug_part(&domain) {
            return Err(EntityIdError::InvalidDomain(domain));
        }
        if !is_slug_part(&object_id) {
            return Err(EntityIdError::InvalidObjectId(object_id));
        }

        Ok(Self { domain, object_id })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

fn is_slug_part(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => {
                Self::new(domain, object_id)
            }
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_id() {
        let id: EntityId = "binary_sensor.octoprint_printing".parse().unwrap();
        assert_eq!(id.domain(), "binary_sensor");
        assert_eq!(id.object_id(), "octoprint_printing");
        assert_eq!(id.to_string(), "binary_sensor.octoprint_printing");
    }

    #[test]
    fn test_separator_count() {
        assert_eq!(
            "binary_sensor".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
        assert_eq!(
            "a.b.c".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
    }

    #[test]
    fn test_empty_halves() {
        assert_eq!(
            ".printing".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyDomain
        );
        assert_eq!(
            "binary_sensor.".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyObjectId
        );
    }

    #[test]
    fn test_character_rules() {
        assert!(matches!(
            "Binary.x".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
        assert!(matches!(
            "binary__sensor.x".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
        assert!(matches!(
            "sensor._x".parse::<EntityId>(),
            Err(EntityIdError::InvalidObjectId(_))
        ));
        assert!(matches!(
            "sensor.x-y".parse::<EntityId>(),
            Err(EntityIdError::InvalidObjectId(_))
        ));
        // double underscores are fine in the object id
        assert!("sensor.x__y".parse::<EntityId>().is_ok());
    }

    #[test]
    fn test_serializes_as_string() {
        let id = EntityId::new("binary_sensor", "tolo").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"binary_sensor.tolo\"");
        assert_eq!(serde_json::from_str::<EntityId>(&json).unwrap(), id);
    }
}
