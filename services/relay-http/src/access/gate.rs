use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use super::{
    AccessDecision, AccessError, AccessStore, AllowListEntry, CredentialVerifier, DenialReason,
    ACCESS_AUDIT_TARGET,
};

pub struct AccessGate {
    store: Arc<AccessStore>,
    verifier: Arc<dyn CredentialVerifier>,
    ttl: Duration,
}

impl AccessGate {
    pub fn new(
        store: Arc<AccessStore>,
        verifier: Arc<dyn CredentialVerifier>,
        ttl: std::time::Duration,
    ) -> Self {
        let ttl = Duration::from_std(ttl)
            .unwrap_or(Duration::seconds(super::DEFAULT_DECISION_TTL_SECS as i64));

        Self {
            store,
            verifier,
            ttl,
        }
    }

    /// Decide whether `identity_id` may use the service.
    ///
    /// A fresh cached decision is returned as-is. Otherwise the credential is
    /// verified first; only a verified caller is looked up in the allow-list.
    /// Both outcomes are cached. The only error is a non-positive identity.
    #[instrument(skip(self, credential))]
    pub fn check_access(
        &self,
        identity_id: i64,
        credential: Option<&str>,
    ) -> Result<AccessDecision, AccessError> {
        if identity_id <= 0 {
            return Err(AccessError::InvalidIdentity(identity_id));
        }

        let now = Utc::now();
        if let Some(decision) = self.store.fresh_decision(identity_id, now, self.ttl) {
            debug!(granted = decision.granted, "returning cached access decision");
            return Ok(decision);
        }

        let generation = self.store.generation();

        let decision = match self.verifier.verify(identity_id, credential) {
            Err(err) => {
                warn!(error = %err, "init data verification failed");
                AccessDecision::denied(
                    identity_id,
                    DenialReason::InvalidCredential(err.to_string()),
                    now,
                )
            }
            Ok(()) => match self.store.entry(identity_id) {
                Some(entry) => {
                    info!(role = %entry.role, "access granted");
                    AccessDecision::granted(entry, now)
                }
                None => {
                    warn!(
                        target: ACCESS_AUDIT_TARGET,
                        identity_id,
                        "access denied: identity not in allow-list"
                    );
                    AccessDecision::denied(identity_id, DenialReason::NotAllowListed, now)
                }
            },
        };

        if !self.store.remember(decision.clone(), generation) {
            debug!("allow-list changed during check, decision not cached");
        }

        Ok(decision)
    }

    /// Insert or overwrite an allow-list entry. The next check for that
    /// identity is evaluated from scratch.
    pub fn add_entry(&self, entry: AllowListEntry) -> Result<AllowListEntry, AccessError> {
        if entry.identity_id <= 0 {
            return Err(AccessError::InvalidIdentity(entry.identity_id));
        }

        let replaced = self.store.upsert(entry.clone()).is_some();
        info!(
            identity_id = entry.identity_id,
            role = %entry.role,
            replaced,
            "allow-list entry saved"
        );

        Ok(entry)
    }

    pub fn entries(&self) -> Vec<AllowListEntry> {
        self.store.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, VerificationPolicy};
    use catalog_relay_init_data::InitDataVerifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TOKEN: &str = "7000000000:AAFakeBotTokenForTests";

    struct CountingVerifier {
        inner: VerificationPolicy,
        calls: AtomicUsize,
    }

    impl CountingVerifier {
        fn strict() -> Self {
            Self {
                inner: VerificationPolicy::Strict(InitDataVerifier::new(TOKEN).unwrap()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CredentialVerifier for CountingVerifier {
        fn verify(&self, identity_id: i64, credential: Option<&str>) -> Result<(), AccessError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(identity_id, credential)
        }
    }

    fn entry(id: i64) -> AllowListEntry {
        AllowListEntry {
            identity_id: id,
            username: Some(format!("user{id}")),
            display_name: format!("User {id}"),
            role: Role::User,
        }
    }

    fn signed_for(id: i64) -> String {
        InitDataVerifier::new(TOKEN)
            .unwrap()
            .sign(&[
                ("auth_date", &Utc::now().timestamp().to_string()),
                ("user", &format!(r#"{{"id":{id}}}"#)),
            ])
            .unwrap()
    }

    fn tamper(blob: &str) -> String {
        let (prefix, hash) = blob.rsplit_once("hash=").unwrap();
        let flipped = if hash.starts_with('a') { "b" } else { "a" };
        format!("{prefix}hash={flipped}{}", &hash[1..])
    }

    fn build_gate(
        entries: Vec<AllowListEntry>,
        ttl: std::time::Duration,
    ) -> (AccessGate, Arc<CountingVerifier>) {
        let verifier = Arc::new(CountingVerifier::strict());
        let gate = AccessGate::new(
            Arc::new(AccessStore::with_entries(entries)),
            verifier.clone(),
            ttl,
        );
        (gate, verifier)
    }

    const FIVE_MINUTES: std::time::Duration = std::time::Duration::from_secs(300);

    #[test]
    fn test_valid_signature_and_allow_listed_is_granted() {
        let (gate, _) = build_gate(vec![entry(100)], FIVE_MINUTES);
        let decision = gate.check_access(100, Some(&signed_for(100))).unwrap();

        assert!(decision.granted);
        assert_eq!(decision.entry, Some(entry(100)));
    }

    #[test]
    fn test_tampered_hash_is_denied() {
        let (gate, _) = build_gate(vec![entry(100)], FIVE_MINUTES);
        let decision = gate
            .check_access(100, Some(&tamper(&signed_for(100))))
            .unwrap();

        assert!(!decision.granted);
        assert!(decision.entry.is_none());
        assert!(matches!(
            decision.reason,
            Some(DenialReason::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_unknown_identity_is_denied() {
        let (gate, _) = build_gate(vec![entry(100)], FIVE_MINUTES);
        let decision = gate.check_access(200, Some(&signed_for(200))).unwrap();

        assert!(!decision.granted);
        assert_eq!(decision.reason, Some(DenialReason::NotAllowListed));
    }

    #[test]
    fn test_non_positive_identity_is_rejected() {
        let (gate, verifier) = build_gate(vec![], FIVE_MINUTES);

        assert_eq!(
            gate.check_access(0, None),
            Err(AccessError::InvalidIdentity(0))
        );
        assert_eq!(
            gate.check_access(-4, None),
            Err(AccessError::InvalidIdentity(-4))
        );
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_fresh_decision_is_reused_without_verification() {
        let (gate, verifier) = build_gate(vec![entry(100)], FIVE_MINUTES);
        let blob = signed_for(100);

        let first = gate.check_access(100, Some(&blob)).unwrap();
        let second = gate.check_access(100, Some(&blob)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.computed_at, second.computed_at);
        assert_eq!(verifier.calls(), 1);
    }

    #[test]
    fn test_denial_is_cached_too() {
        let (gate, verifier) = build_gate(vec![entry(100)], FIVE_MINUTES);

        let denied = gate.check_access(100, Some("hash=00")).unwrap();
        let again = gate.check_access(100, Some(&signed_for(100))).unwrap();

        assert!(!denied.granted);
        assert_eq!(denied, again);
        assert_eq!(verifier.calls(), 1);
    }

    #[test]
    fn test_stale_decision_is_recomputed() {
        let (gate, verifier) = build_gate(vec![entry(100)], std::time::Duration::from_millis(20));
        let blob = signed_for(100);

        gate.check_access(100, Some(&blob)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(40));
        gate.check_access(100, Some(&blob)).unwrap();

        assert_eq!(verifier.calls(), 2);
    }

    #[test]
    fn test_add_entry_invalidates_cached_denial() {
        let (gate, verifier) = build_gate(vec![], FIVE_MINUTES);
        let blob = signed_for(300);

        let before = gate.check_access(300, Some(&blob)).unwrap();
        assert!(!before.granted);

        gate.add_entry(entry(300)).unwrap();

        let after = gate.check_access(300, Some(&blob)).unwrap();
        assert!(after.granted);
        assert_eq!(verifier.calls(), 2);
    }

    #[test]
    fn test_add_entry_rejects_non_positive_identity() {
        let (gate, _) = build_gate(vec![], FIVE_MINUTES);

        assert_eq!(
            gate.add_entry(entry(0)),
            Err(AccessError::InvalidIdentity(0))
        );
        assert!(gate.entries().is_empty());
    }

    #[test]
    fn test_fail_open_grants_allow_listed_without_credential() {
        let gate = AccessGate::new(
            Arc::new(AccessStore::with_entries(vec![entry(100)])),
            Arc::new(VerificationPolicy::InsecureFailOpen),
            FIVE_MINUTES,
        );

        assert!(gate.check_access(100, None).unwrap().granted);
        assert!(!gate.check_access(101, None).unwrap().granted);
    }
}
