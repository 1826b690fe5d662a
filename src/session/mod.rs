use crate::role::RoleName;
use serde::{Deserialize, Serialize};

pub mod coordinator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Error => "error",
        }
    }
}

/// Who is using the app right now. Owned by the coordinator; everyone else
/// reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub address: Option<String>,
    pub role: Option<RoleName>,
    pub status: SessionStatus,
    pub last_error: Option<String>,
}

impl Session {
    /// A role is only meaningful once an address is known.
    pub fn is_consistent(&self) -> bool {
        self.role.is_none() || self.address.is_some()
    }

    /// The last failure, unless a new attempt is already under way. Account
    /// switches can fail while the status stays idle.
    pub fn visible_error(&self) -> Option<&str> {
        if self.status == SessionStatus::Connecting {
            return None;
        }
        self.last_error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Active,
    Rejected,
}

impl AccountStatus {
    /// Verifiers wait for admin approval; everyone else starts active.
    pub fn initial_for(role: RoleName) -> Self {
        if role == RoleName::Verifier {
            Self::Pending
        } else {
            Self::Active
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    #[serde(rename = "wallet_address")]
    pub address: String,
    pub role: RoleName,
    pub status: AccountStatus,
}

/// Trimmed, lowercased wallet address, or `None` when nothing is left.
pub fn normalize_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

/// `0x1234...abcd` form used by the navbar.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::{normalize_address, short_address, AccountStatus, RoleRecord, Session, SessionStatus};
    use crate::role::RoleName;

    #[test]
    fn verifier_registrations_start_pending() {
        assert_eq!(AccountStatus::initial_for(RoleName::Verifier), AccountStatus::Pending);
        assert_eq!(AccountStatus::initial_for(RoleName::Farmer), AccountStatus::Active);
        assert_eq!(AccountStatus::initial_for(RoleName::Financial), AccountStatus::Active);
    }

    #[test]
    fn normalize_address_lowercases_and_rejects_blank() {
        assert_eq!(normalize_address(" 0xAbC ").as_deref(), Some("0xabc"));
        assert!(normalize_address("   ").is_none());
    }

    #[test]
    fn short_address_keeps_prefix_and_suffix() {
        assert_eq!(
            short_address("0x52908400098527886e0f7030069857d2e4169ee7"),
            "0x5290...9ee7"
        );
        assert_eq!(short_address("0xaa"), "0xaa");
    }

    #[test]
    fn role_record_decodes_backend_row() {
        let row = r#"{"wallet_address":"0xaa","role":"farmer","status":"active","auth_type":"web3"}"#;
        let record: RoleRecord = serde_json::from_str(row).expect("row should decode");
        assert_eq!(record.address, "0xaa");
        assert_eq!(record.role, RoleName::Farmer);
        assert_eq!(record.status, AccountStatus::Active);
    }

    #[test]
    fn consistency_requires_address_for_role() {
        let session = Session::default();
        assert!(session.is_consistent());
        let dangling = Session {
            role: Some(RoleName::Farmer),
            ..Session::default()
        };
        assert!(!dangling.is_consistent());
    }

    #[test]
    fn idle_session_still_surfaces_a_failed_account_switch() {
        let mut session = Session {
            address: Some("0xdd".to_string()),
            role: None,
            status: SessionStatus::Idle,
            last_error: Some("backend error: timeout".to_string()),
        };
        assert_eq!(session.visible_error(), Some("backend error: timeout"));

        session.status = SessionStatus::Connecting;
        assert_eq!(session.visible_error(), None);

        session.status = SessionStatus::Error;
        assert_eq!(session.visible_error(), Some("backend error: timeout"));
    }
}
