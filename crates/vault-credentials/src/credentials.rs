//! Credential values and the validated view of a raw secret.

use crate::error::{CredentialError, ShapeIssue};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Provider name reported in every [`Credentials`] value.
pub const VAULT_PROVIDER_NAME: &str = "VaultConfigProvider";

/// Raw secret as returned by a secret source.
pub type SecretMap = HashMap<String, Value>;

/// An access key / secret key pair handed to callers.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub provider_name: String,
}

impl Credentials {
    /// Access key id with everything but the first four characters masked.
    pub fn masked_access_key_id(&self) -> String {
        let visible: String = self.access_key_id.chars().take(4).collect();
        let hidden = self.access_key_id.chars().count().saturating_sub(4);
        format!("{}{}", visible, "*".repeat(hidden))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.masked_access_key_id())
            .field("secret_access_key", &"<redacted>")
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

struct Entry {
    name: String,
    value: String,
}

/// The two tracked secret fields.
///
/// The set of names is fixed at construction. Values only change through
/// [`CredentialSet::validate_and_merge`], which either replaces both or
/// neither.
pub struct CredentialSet {
    // [access key, secret key]
    entries: [Entry; 2],
}

impl CredentialSet {
    /// Create a set tracking the given field names, both values empty.
    pub fn new(access_key_name: impl Into<String>, secret_key_name: impl Into<String>) -> Self {
        Self {
            entries: [
                Entry {
                    name: access_key_name.into(),
                    value: String::new(),
                },
                Entry {
                    name: secret_key_name.into(),
                    value: String::new(),
                },
            ],
        }
    }

    /// Check every tracked field in `raw`, then copy them in.
    ///
    /// Nothing is written unless all fields are present and string-typed.
    pub fn validate_and_merge(&mut self, raw: &SecretMap) -> Result<(), CredentialError> {
        for entry in &self.entries {
            match raw.get(&entry.name) {
                Some(Value::String(_)) => {}
                Some(_) => return Err(shape_mismatch(&entry.name, ShapeIssue::NotAString)),
                None => return Err(shape_mismatch(&entry.name, ShapeIssue::Missing)),
            }
        }

        for entry in &mut self.entries {
            if let Some(Value::String(value)) = raw.get(&entry.name) {
                entry.value.clone_from(value);
            }
        }

        Ok(())
    }

    /// Current values tagged with the provider name.
    pub fn snapshot(&self) -> Credentials {
        let [access, secret] = &self.entries;
        Credentials {
            access_key_id: access.value.clone(),
            secret_access_key: secret.value.clone(),
            provider_name: VAULT_PROVIDER_NAME.to_string(),
        }
    }
}

fn shape_mismatch(key: &str, reason: ShapeIssue) -> CredentialError {
    CredentialError::SecretShapeMismatch {
        key: key.to_string(),
        reason,
    }
}
