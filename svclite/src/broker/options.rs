//! Request options and broker configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use svclite_shared::{ComponentName, ServiceKey};

use super::record::ServiceInfo;

/// Options map for a create/attach or remove request.
///
/// Serde field names are the wire keys from
/// `svclite_shared::constants::service_args`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceOptions {
    #[serde(rename = "svclite:user-service-arg-component")]
    pub component: ComponentName,

    /// Overrides the class name in key derivation when present.
    #[serde(
        rename = "svclite:user-service-arg-tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,

    /// Requester-supplied version; a mismatch invalidates an existing
    /// record for the same key.
    #[serde(
        rename = "svclite:user-service-arg-version-code",
        default = "default_version_code"
    )]
    pub version_code: u32,

    #[serde(
        rename = "svclite:user-service-arg-process-name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub process_name_suffix: Option<String>,

    #[serde(rename = "svclite:user-service-arg-debuggable", default)]
    pub debuggable: bool,
}

fn default_version_code() -> u32 {
    1
}

impl ServiceOptions {
    pub fn new(component: ComponentName) -> Self {
        Self {
            component,
            tag: None,
            version_code: default_version_code(),
            process_name_suffix: None,
            debuggable: false,
        }
    }

    /// Key of the logical service slot these options address.
    pub fn service_key(&self) -> ServiceKey {
        ServiceKey::derive(&self.component, self.tag.as_deref())
    }
}

/// Hook invoked with a record snapshot on lifecycle transitions.
pub type RecordHook = Arc<dyn Fn(&ServiceInfo) + Send + Sync>;

/// Broker configuration.
#[derive(Clone, Default)]
pub struct BrokerOptions {
    /// Invoked after a record is created, before its spawn is scheduled.
    pub on_record_created: Option<RecordHook>,

    /// Invoked after a record is removed from the table.
    pub on_record_removed: Option<RecordHook>,
}

impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("on_record_created", &self.on_record_created.is_some())
            .field("on_record_removed", &self.on_record_removed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svclite_shared::constants::service_args;

    #[test]
    fn test_wire_keys_match_constants() {
        let options = ServiceOptions {
            component: ComponentName::new("com.example.app", "ExampleService"),
            tag: Some("worker".to_string()),
            version_code: 3,
            process_name_suffix: Some("svc".to_string()),
            debuggable: true,
        };

        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get(service_args::COMPONENT).is_some());
        assert_eq!(json[service_args::TAG], "worker");
        assert_eq!(json[service_args::VERSION_CODE], 3);
        assert_eq!(json[service_args::PROCESS_NAME], "svc");
        assert_eq!(json[service_args::DEBUGGABLE], true);
    }

    #[test]
    fn test_defaults_applied_on_parse() {
        let json = format!(
            r#"{{"{}": {{"package": "com.example.app", "class_name": "ExampleService"}}}}"#,
            service_args::COMPONENT
        );

        let options: ServiceOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(options.version_code, 1);
        assert!(options.tag.is_none());
        assert!(!options.debuggable);
    }

    #[test]
    fn test_service_key_derivation() {
        let mut options =
            ServiceOptions::new(ComponentName::new("com.example.app", "ExampleService"));
        assert_eq!(
            options.service_key().as_str(),
            "com.example.app:ExampleService"
        );

        options.tag = Some("worker".to_string());
        assert_eq!(options.service_key().as_str(), "com.example.app:worker");
    }
}
