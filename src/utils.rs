use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

/// Accounts without a usable password can never log in.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if password_hash.is_empty() {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Request bodies must be JSON objects.
pub fn body_object(body: Value) -> AppResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::bad_request("request body must be a JSON object")),
    }
}

/// Decode a (possibly filtered) body into a request type, naming the field
/// that failed.
pub fn parse_body<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_path_to_error::deserialize(body).map_err(|err| {
        let path = err.path().to_string();
        let field = if path == "." { "body".to_string() } else { path };
        AppError::validation(field, err.into_inner().to_string())
    })
}

pub fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|err| AppError::internal(format!("failed to serialize response: {err}")))
}

pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, "this field may not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default, deserialize_with = "double_option")]
        note: Option<Option<String>>,
    }

    #[test]
    fn parse_body_names_the_failing_field() {
        let err = parse_body::<Sample>(json!({"name": 5})).unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn double_option_tells_null_from_absent() {
        let absent: Sample = parse_body(json!({"name": "a"})).unwrap();
        assert!(absent.note.is_none());

        let null: Sample = parse_body(json!({"name": "a", "note": null})).unwrap();
        assert_eq!(null.note, Some(None));

        let set: Sample = parse_body(json!({"name": "a", "note": "x"})).unwrap();
        assert_eq!(set.note, Some(Some("x".to_string())));
        assert_eq!(set.name, "a");
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(hash_password("short"), Err(AppError::Validation { .. })));
    }

    #[test]
    fn password_round_trip_and_empty_hash() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(!verify_password("anything", "").unwrap());
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(body_object(json!([1, 2])).is_err());
        assert!(body_object(json!({"a": 1})).is_ok());
    }
}
