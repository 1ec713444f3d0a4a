use crate::common::errors::BusinessError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Login body. Fields are optional so missing ones are reported per field.
#[derive(ToSchema, Deserialize, Debug, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Returns `(username, password)` or every missing field at once.
    pub fn require(self) -> Result<(String, String), BusinessError> {
        let mut fields = BTreeMap::new();
        let username = required("username", self.username, &mut fields);
        let password = required("password", self.password, &mut fields);

        match (username, password) {
            (Some(username), Some(password)) if fields.is_empty() => Ok((username, password)),
            _ => Err(BusinessError::InvalidFields { fields }),
        }
    }
}

fn required(
    name: &str,
    value: Option<String>,
    fields: &mut BTreeMap<String, Vec<String>>,
) -> Option<String> {
    match value {
        None => {
            fields.insert(name.to_string(), vec!["This field is required.".to_string()]);
            None
        }
        Some(value) if value.trim().is_empty() => {
            fields.insert(name.to_string(), vec!["This field may not be blank.".to_string()]);
            None
        }
        Some(value) => Some(value),
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub status: String,
    pub detail: String,
}
