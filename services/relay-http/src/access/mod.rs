mod entry;
mod error;
mod gate;
mod store;
mod verifier;

pub use entry::{AccessDecision, AllowListEntry, DenialReason, Role};
pub use error::AccessError;
pub use gate::AccessGate;
pub use store::AccessStore;
pub use verifier::{CredentialVerifier, VerificationPolicy};

pub const DEFAULT_DECISION_TTL_SECS: u64 = 300;

/// Tracing target for denied identities, so operators can route them apart.
pub const ACCESS_AUDIT_TARGET: &str = "access_audit";
