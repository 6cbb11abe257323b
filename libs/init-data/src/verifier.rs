use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use url::form_urlencoded;

use super::{InitData, InitDataError, HASH_FIELD, WEB_APP_DATA_KEY};

type HmacSha256 = Hmac<Sha256>;

pub struct InitDataVerifier {
    secret_key: Vec<u8>,
    max_age: Option<Duration>,
}

impl InitDataVerifier {
    /// Build a verifier from the bot token shared with the platform.
    pub fn new(shared_secret: &str) -> Result<Self, InitDataError> {
        if shared_secret.trim().is_empty() {
            return Err(InitDataError::InvalidKey("shared secret cannot be empty".into()));
        }

        let mut mac = HmacSha256::new_from_slice(WEB_APP_DATA_KEY)
            .map_err(|err| InitDataError::InvalidKey(err.to_string()))?;
        mac.update(shared_secret.as_bytes());
        let secret_key = mac.finalize().into_bytes().to_vec();

        Ok(Self {
            secret_key,
            max_age: None,
        })
    }

    /// Reject blobs whose `auth_date` is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn verify(&self, raw: &str) -> Result<InitData, InitDataError> {
        self.verify_at(raw, Utc::now())
    }

    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<InitData, InitDataError> {
        let data = InitData::parse(raw)?;
        let hash = data.hash().ok_or(InitDataError::MissingHash)?;
        let expected = hex::decode(hash).map_err(|_| InitDataError::InvalidHashEncoding)?;

        let mut mac = self.mac()?;
        mac.update(data.data_check_string().as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| InitDataError::SignatureMismatch)?;

        if let Some(max_age) = self.max_age {
            if let Some(auth_date) = data.auth_date()? {
                let age = now.signed_duration_since(auth_date);
                if age > max_age {
                    return Err(InitDataError::Expired {
                        age_secs: age.num_seconds(),
                        max_age_secs: max_age.num_seconds(),
                    });
                }
            }
        }

        debug!(fields = data.fields().count(), "init data signature verified");
        Ok(data)
    }

    /// Produce a signed, URL-encoded blob for the given fields.
    pub fn sign(&self, fields: &[(&str, &str)]) -> Result<String, InitDataError> {
        let data = InitData::from_fields(fields.iter().copied());
        let mut mac = self.mac()?;
        mac.update(data.data_check_string().as_bytes());
        let hash = hex::encode(mac.finalize().into_bytes());

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in data.fields() {
            serializer.append_pair(key, value);
        }
        serializer.append_pair(HASH_FIELD, &hash);
        Ok(serializer.finish())
    }

    fn mac(&self) -> Result<HmacSha256, InitDataError> {
        HmacSha256::new_from_slice(&self.secret_key)
            .map_err(|err| InitDataError::InvalidKey(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "7000000000:AAFakeBotTokenForTests";

    #[test]
    fn test_rejects_empty_secret() {
        assert!(matches!(
            InitDataVerifier::new("   "),
            Err(InitDataError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_sign_then_verify() {
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        let blob = verifier
            .sign(&[("query_id", "q1"), ("auth_date", "1700000000")])
            .unwrap();

        let data = verifier.verify(&blob).unwrap();
        assert_eq!(data.get("query_id"), Some("q1"));
    }

    #[test]
    fn test_tampered_hash_is_rejected() {
        let verifier = InitDataVerifier::new(TOKEN).unwrap();
        let blob = verifier.sign(&[("query_id", "q1")]).unwrap();
        let (prefix, hash) = blob.rsplit_once("hash=").unwrap();
        let flipped = if hash.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{prefix}hash={flipped}{}", &hash[1..]);

        assert_eq!(
            verifier.verify(&tampered).unwrap_err(),
            InitDataError::SignatureMismatch
        );
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let signer = InitDataVerifier::new(TOKEN).unwrap();
        let verifier = InitDataVerifier::new("another:token").unwrap();
        let blob = signer.sign(&[("query_id", "q1")]).unwrap();

        assert_eq!(
            verifier.verify(&blob).unwrap_err(),
            InitDataError::SignatureMismatch
        );
    }

    #[test]
    fn test_missing_and_malformed_hash() {
        let verifier = InitDataVerifier::new(TOKEN).unwrap();

        assert_eq!(
            verifier.verify("query_id=q1").unwrap_err(),
            InitDataError::MissingHash
        );
        assert_eq!(
            verifier.verify("query_id=q1&hash=zz").unwrap_err(),
            InitDataError::InvalidHashEncoding
        );
    }

    #[test]
    fn test_max_age() {
        let verifier = InitDataVerifier::new(TOKEN)
            .unwrap()
            .with_max_age(Some(Duration::hours(1)));
        let blob = verifier.sign(&[("auth_date", "1700000000")]).unwrap();
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(verifier
            .verify_at(&blob, issued + Duration::minutes(30))
            .is_ok());
        assert!(matches!(
            verifier.verify_at(&blob, issued + Duration::hours(2)),
            Err(InitDataError::Expired { .. })
        ));
    }
}
