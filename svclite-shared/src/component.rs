//! Component identity and service-key derivation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a remote service implementation: owning package plus the
/// class inside it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class_name: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class_name: class_name.into(),
        }
    }

    /// Text form used across the channel: `package/class`.
    pub fn to_short_string(&self) -> String {
        format!("{}/{}", self.package, self.class_name)
    }

    /// Parse the `package/class` text form.
    pub fn from_short_string(s: &str) -> Result<Self, String> {
        match s.split_once('/') {
            Some((package, class_name)) if !package.is_empty() && !class_name.is_empty() => {
                Ok(Self::new(package, class_name))
            }
            _ => Err(format!(
                "invalid component '{}': expected package/class",
                s
            )),
        }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_short_string())
    }
}

impl FromStr for ComponentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_short_string(s)
    }
}

/// Identity of one logical service slot.
///
/// Derived from the requester package plus either an explicit tag or the
/// target class name. At most one live record exists per key; the key is
/// not unique across versions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Derive the slot key: `package:tag` when a tag is given, otherwise
    /// `package:class`.
    pub fn derive(component: &ComponentName, tag: Option<&str>) -> Self {
        Self(format!(
            "{}:{}",
            component.package,
            tag.unwrap_or(&component.class_name)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_short_string_round_trip() {
        let component = ComponentName::new("com.example.app", "ExampleService");
        let parsed: ComponentName = component.to_short_string().parse().unwrap();
        assert_eq!(parsed, component);
    }

    #[test]
    fn test_component_rejects_malformed() {
        assert!(ComponentName::from_short_string("no-slash").is_err());
        assert!(ComponentName::from_short_string("/Class").is_err());
        assert!(ComponentName::from_short_string("pkg/").is_err());
    }

    #[test]
    fn test_key_uses_class_without_tag() {
        let component = ComponentName::new("com.example.app", "ExampleService");
        let key = ServiceKey::derive(&component, None);
        assert_eq!(key.as_str(), "com.example.app:ExampleService");
    }

    #[test]
    fn test_key_tag_overrides_class() {
        let component = ComponentName::new("com.example.app", "ExampleService");
        let key = ServiceKey::derive(&component, Some("worker"));
        assert_eq!(key.as_str(), "com.example.app:worker");
    }
}
