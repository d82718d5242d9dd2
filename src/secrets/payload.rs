//! Database credential payloads stored in a secret.
//!
//! Secret stores hold credentials as a JSON document in the shape RDS-managed
//! secrets use:
//!
//! ```json
//! {
//!   "host": "db.internal",
//!   "port": 5432,
//!   "dbname": "app",
//!   "username": "app",
//!   "password": "..."
//! }
//! ```
//!
//! `port` may be a number or a numeric string. `database` is accepted as an
//! alias of `dbname`. Unknown keys (`engine`, `dbInstanceIdentifier`, ...)
//! are ignored.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::{Result, SecretsError};
use super::types::SecretString;

/// Credentials resolved from a secret store.
///
/// `port` and `database` are optional: when absent the statically configured
/// values are kept during overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub host: String,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default, rename = "dbname", alias = "database")]
    pub database: Option<String>,
    pub username: String,
    pub password: SecretString,
}

impl CredentialPayload {
    /// Decode a payload from the JSON document returned by a store.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(SecretsError::invalid_value("secret payload must be a JSON object"));
        }

        let payload: Self = serde_json::from_value(value)
            .map_err(|e| SecretsError::invalid_value(format!("malformed credentials: {}", e)))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Decode a payload from a raw secret string.
    pub fn from_secret_string(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| {
            // serde_json echoes input fragments on some errors; keep the secret out of it.
            SecretsError::invalid_value("secret string is not valid JSON")
        })?;
        Self::from_value(value)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SecretsError::invalid_value("credential 'host' cannot be empty"));
        }
        if self.username.trim().is_empty() {
            return Err(SecretsError::invalid_value("credential 'username' cannot be empty"));
        }
        if self.port == Some(0) {
            return Err(SecretsError::invalid_value("credential 'port' must be non-zero"));
        }
        Ok(())
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match Option::<PortValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortValue::Number(port)) => Ok(Some(port)),
        Some(PortValue::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rds_style_payload() {
        let payload = CredentialPayload::from_value(json!({
            "engine": "postgres",
            "host": "h1",
            "port": 5432,
            "dbname": "app",
            "username": "u",
            "password": "p1",
            "dbInstanceIdentifier": "prod-db"
        }))
        .unwrap();

        assert_eq!(payload.host, "h1");
        assert_eq!(payload.port, Some(5432));
        assert_eq!(payload.database.as_deref(), Some("app"));
        assert_eq!(payload.username, "u");
        assert_eq!(payload.password.expose_secret(), "p1");
    }

    #[test]
    fn test_port_as_string_and_database_alias() {
        let payload = CredentialPayload::from_secret_string(
            r#"{"host":"h","port":"6543","database":"reports","username":"u","password":"p"}"#,
        )
        .unwrap();

        assert_eq!(payload.port, Some(6543));
        assert_eq!(payload.database.as_deref(), Some("reports"));
    }

    #[test]
    fn test_optional_port_and_database() {
        let payload = CredentialPayload::from_value(
            json!({"host": "h", "username": "u", "password": "p"}),
        )
        .unwrap();

        assert_eq!(payload.port, None);
        assert_eq!(payload.database, None);
    }

    #[test]
    fn test_missing_password_is_invalid() {
        let err = CredentialPayload::from_value(json!({"host": "h", "username": "u"})).unwrap_err();
        assert!(matches!(err, SecretsError::InvalidValue { .. }));
    }

    #[test]
    fn test_non_object_is_invalid() {
        let err = CredentialPayload::from_value(json!("just-a-password")).unwrap_err();
        assert!(matches!(err, SecretsError::InvalidValue { .. }));
    }

    #[test]
    fn test_bad_json_does_not_leak_input() {
        let err = CredentialPayload::from_secret_string("password=hunter2").unwrap_err();
        assert!(matches!(err, SecretsError::InvalidValue { .. }));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_empty_host_or_zero_port_rejected() {
        assert!(CredentialPayload::from_value(
            json!({"host": " ", "username": "u", "password": "p"})
        )
        .is_err());
        assert!(CredentialPayload::from_value(
            json!({"host": "h", "port": 0, "username": "u", "password": "p"})
        )
        .is_err());
        assert!(CredentialPayload::from_value(
            json!({"host": "h", "port": "abc", "username": "u", "password": "p"})
        )
        .is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let payload = CredentialPayload::from_value(
            json!({"host": "h", "username": "u", "password": "topsecret"}),
        )
        .unwrap();
        assert!(!format!("{:?}", payload).contains("topsecret"));
    }
}
