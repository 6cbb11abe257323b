use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use url::form_urlencoded;

use super::{InitDataError, HASH_FIELD};

/// Decoded init data with the signature split off from the signed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: BTreeMap<String, String>,
    hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserField {
    id: i64,
}

impl InitData {
    /// Parse a URL-encoded init data string. Values are percent-decoded.
    pub fn parse(raw: &str) -> Result<Self, InitDataError> {
        if raw.trim().is_empty() {
            return Err(InitDataError::Empty);
        }

        let mut fields = BTreeMap::new();
        let mut hash = None;

        for (key, value) in form_urlencoded::parse(raw.trim().as_bytes()) {
            if key == HASH_FIELD {
                if hash.replace(value.into_owned()).is_some() {
                    return Err(InitDataError::DuplicateField(HASH_FIELD.to_string()));
                }
                continue;
            }

            let key = key.into_owned();
            if fields.contains_key(&key) {
                return Err(InitDataError::DuplicateField(key));
            }
            fields.insert(key, value.into_owned());
        }

        Ok(Self { fields, hash })
    }

    pub(crate) fn from_fields<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fields = pairs
            .into_iter()
            .filter(|(key, _)| *key != HASH_FIELD)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self { fields, hash: None }
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical string covered by the signature: every field except `hash`,
    /// sorted by key, rendered as `key=value` and joined with `\n`.
    pub fn data_check_string(&self) -> String {
        self.fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Identity carried in the `user` JSON object, if present.
    pub fn user_id(&self) -> Result<Option<i64>, InitDataError> {
        let Some(raw) = self.get("user") else {
            return Ok(None);
        };

        let user: UserField = serde_json::from_str(raw)
            .map_err(|err| InitDataError::InvalidUser(err.to_string()))?;
        Ok(Some(user.id))
    }

    pub fn auth_date(&self) -> Result<Option<DateTime<Utc>>, InitDataError> {
        let Some(raw) = self.get("auth_date") else {
            return Ok(None);
        };

        let seconds: i64 = raw
            .parse()
            .map_err(|_| InitDataError::InvalidAuthDate(raw.to_string()))?;

        Utc.timestamp_opt(seconds, 0)
            .single()
            .map(Some)
            .ok_or_else(|| InitDataError::InvalidAuthDate(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_hash_from_fields() {
        let data = InitData::parse("query_id=AAH&auth_date=1700000000&hash=abcdef").unwrap();

        assert_eq!(data.hash(), Some("abcdef"));
        assert_eq!(data.get("query_id"), Some("AAH"));
        assert!(data.get("hash").is_none());
    }

    #[test]
    fn test_data_check_string_is_sorted_and_decoded() {
        let data = InitData::parse(
            "user=%7B%22id%22%3A7%7D&auth_date=1700000000&query_id=q1&hash=00",
        )
        .unwrap();

        assert_eq!(
            data.data_check_string(),
            "auth_date=1700000000\nquery_id=q1\nuser={\"id\":7}"
        );
    }

    #[test]
    fn test_parse_rejects_empty_and_duplicates() {
        assert_eq!(InitData::parse("  "), Err(InitDataError::Empty));
        assert_eq!(
            InitData::parse("a=1&a=2&hash=00"),
            Err(InitDataError::DuplicateField("a".to_string()))
        );
        assert_eq!(
            InitData::parse("a=1&hash=00&hash=01"),
            Err(InitDataError::DuplicateField("hash".to_string()))
        );
    }

    #[test]
    fn test_user_id_and_auth_date() {
        let raw = "user=%7B%22id%22%3A42%2C%22first_name%22%3A%22A%22%7D&auth_date=1700000000";
        let data = InitData::parse(raw).unwrap();
        assert_eq!(data.user_id().unwrap(), Some(42));
        assert_eq!(data.auth_date().unwrap().unwrap().timestamp(), 1_700_000_000);

        let broken = InitData::parse("user=not-json&auth_date=yesterday").unwrap();
        assert!(matches!(broken.user_id(), Err(InitDataError::InvalidUser(_))));
        assert!(matches!(
            broken.auth_date(),
            Err(InitDataError::InvalidAuthDate(_))
        ));

        let bare = InitData::parse("query_id=q").unwrap();
        assert_eq!(bare.user_id().unwrap(), None);
        assert_eq!(bare.auth_date().unwrap(), None);
    }
}
