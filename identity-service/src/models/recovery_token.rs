use chrono::{DateTime, Utc};

/// Single-use, time-limited grant permitting a secret reset without the old
/// secret. Redemption deletes the row; expired rows stay behind, inert.
#[derive(Debug, Clone)]
pub struct RecoveryToken {
    pub id: i64,
    pub staff_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RecoveryToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = RecoveryToken {
            id: 1,
            staff_id: 1,
            token: "abc".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(30),
        };
        assert!(!live.is_expired());

        let stale = RecoveryToken {
            expires_at: now - Duration::seconds(1),
            ..live
        };
        assert!(stale.is_expired());
    }
}
