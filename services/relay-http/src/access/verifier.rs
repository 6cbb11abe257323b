use catalog_relay_init_data::InitDataVerifier;
use tracing::warn;

use super::AccessError;

/// Checks that a credential blob genuinely belongs to `identity_id`.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, identity_id: i64, credential: Option<&str>) -> Result<(), AccessError>;
}

/// How init data signatures are treated.
pub enum VerificationPolicy {
    /// Every credential must carry a valid signature for the caller.
    Strict(InitDataVerifier),
    /// No bot token is configured and the operator explicitly opted into
    /// accepting unverified callers. Every skip is logged.
    InsecureFailOpen,
    /// No bot token and no opt-in: every check fails closed.
    Unconfigured,
}

impl CredentialVerifier for VerificationPolicy {
    fn verify(&self, identity_id: i64, credential: Option<&str>) -> Result<(), AccessError> {
        match self {
            VerificationPolicy::Strict(verifier) => {
                let raw = credential
                    .filter(|raw| !raw.trim().is_empty())
                    .ok_or(AccessError::MissingCredential)?;
                let data = verifier.verify(raw)?;

                if let Some(actual) = data.user_id()? {
                    if actual != identity_id {
                        return Err(AccessError::IdentityMismatch {
                            expected: identity_id,
                            actual,
                        });
                    }
                }

                Ok(())
            }
            VerificationPolicy::InsecureFailOpen => {
                warn!(
                    identity_id,
                    has_credential = credential.is_some(),
                    "init data verification skipped (insecure mode)"
                );
                Ok(())
            }
            VerificationPolicy::Unconfigured => Err(AccessError::VerificationUnavailable),
        }
    }
}
