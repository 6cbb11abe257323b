use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccessError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "user" => Ok(Role::User),
            other => Err(AccessError::InvalidRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    #[serde(rename = "user_id")]
    pub identity_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The credential blob failed verification; the allow-list was not consulted.
    InvalidCredential(String),
    NotAllowListed,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::InvalidCredential(reason) => {
                write!(f, "credential verification failed: {reason}")
            }
            DenialReason::NotAllowListed => f.write_str("user is not in the allow-list"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub identity_id: i64,
    pub granted: bool,
    pub entry: Option<AllowListEntry>,
    pub reason: Option<DenialReason>,
    pub computed_at: DateTime<Utc>,
}

impl AccessDecision {
    pub fn granted(entry: AllowListEntry, computed_at: DateTime<Utc>) -> Self {
        Self {
            identity_id: entry.identity_id,
            granted: true,
            entry: Some(entry),
            reason: None,
            computed_at,
        }
    }

    pub fn denied(identity_id: i64, reason: DenialReason, computed_at: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            granted: false,
            entry: None,
            reason: Some(reason),
            computed_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.computed_at) < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_from_str() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" manager ".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(
            "root".parse::<Role>().unwrap_err(),
            AccessError::InvalidRole("root".to_string())
        );
    }

    #[test]
    fn test_entry_wire_names() {
        let entry = AllowListEntry {
            identity_id: 7,
            username: Some("seven".to_string()),
            display_name: "Seven".to_string(),
            role: Role::Manager,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "user_id": 7,
                "username": "seven",
                "name": "Seven",
                "role": "manager"
            })
        );
    }

    #[test]
    fn test_decision_freshness() {
        let now = Utc::now();
        let decision = AccessDecision::denied(1, DenialReason::NotAllowListed, now);
        let ttl = Duration::minutes(5);

        assert!(decision.is_fresh(now + Duration::minutes(4), ttl));
        assert!(!decision.is_fresh(now + Duration::minutes(5), ttl));
    }
}
