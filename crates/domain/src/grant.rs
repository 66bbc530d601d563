//! One-time access grants and their expiry policy.

use chrono::{DateTime, Duration, Utc};
use keyshare_core::{AppError, AppResult, GrantId, RelationId, UserId};
use serde::{Deserialize, Serialize};

/// Redemption window applied to new grants unless configured otherwise.
pub const DEFAULT_GRANT_TTL_SECONDS: i64 = 15 * 60;

/// Longest redemption window a grant may carry.
pub const MAX_GRANT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// How a guest relation created from a grant runs out.
///
/// The two bounded policies are mutually exclusive by construction; values
/// built directly must still pass [`ExpiryPolicy::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Access stays until revoked.
    Unbounded,
    /// Access lasts a number of minutes from relation creation.
    ByTime {
        /// Minutes of access allowed.
        minutes_allowed: u32,
    },
    /// Access lasts a number of guest logins.
    ByLogins {
        /// Guest logins allowed.
        logins_allowed: u32,
    },
}

impl ExpiryPolicy {
    /// Builds a policy from the flag and companion-value pairs used in
    /// requests and persisted rows.
    ///
    /// A set flag requires a positive companion value, a companion value
    /// requires its flag, and at most one policy may be populated.
    pub fn from_parts(
        expire_by_time: bool,
        minutes_allowed: Option<i64>,
        expire_by_logins: bool,
        logins_allowed: Option<i64>,
    ) -> AppResult<Self> {
        if expire_by_time && expire_by_logins {
            return Err(AppError::Validation(
                "expire_by_time and expire_by_logins are mutually exclusive".to_owned(),
            ));
        }

        if !expire_by_time && minutes_allowed.is_some() {
            return Err(AppError::Validation(
                "minutes_allowed requires expire_by_time".to_owned(),
            ));
        }

        if !expire_by_logins && logins_allowed.is_some() {
            return Err(AppError::Validation(
                "logins_allowed requires expire_by_logins".to_owned(),
            ));
        }

        if expire_by_time {
            let minutes_allowed = positive_allowance("minutes_allowed", minutes_allowed)?;
            return Ok(Self::ByTime { minutes_allowed });
        }

        if expire_by_logins {
            let logins_allowed = positive_allowance("logins_allowed", logins_allowed)?;
            return Ok(Self::ByLogins { logins_allowed });
        }

        Ok(Self::Unbounded)
    }

    /// Checks that a bounded policy carries a positive allowance.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            Self::ByTime { minutes_allowed: 0 } => Err(AppError::Validation(
                "minutes_allowed must be greater than zero".to_owned(),
            )),
            Self::ByLogins { logins_allowed: 0 } => Err(AppError::Validation(
                "logins_allowed must be greater than zero".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// Returns whether access is bounded by elapsed time.
    #[must_use]
    pub fn expire_by_time(&self) -> bool {
        matches!(self, Self::ByTime { .. })
    }

    /// Returns the minutes of access, when bounded by time.
    #[must_use]
    pub fn minutes_allowed(&self) -> Option<u32> {
        match self {
            Self::ByTime { minutes_allowed } => Some(*minutes_allowed),
            _ => None,
        }
    }

    /// Returns whether access is bounded by guest logins.
    #[must_use]
    pub fn expire_by_logins(&self) -> bool {
        matches!(self, Self::ByLogins { .. })
    }

    /// Returns the number of guest logins, when bounded by logins.
    #[must_use]
    pub fn logins_allowed(&self) -> Option<u32> {
        match self {
            Self::ByLogins { logins_allowed } => Some(*logins_allowed),
            _ => None,
        }
    }
}

fn positive_allowance(name: &str, value: Option<i64>) -> AppResult<u32> {
    let value =
        value.ok_or_else(|| AppError::Validation(format!("{name} is required by its policy")))?;

    if value <= 0 {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    u32::try_from(value).map_err(|_| AppError::Validation(format!("{name} is too large")))
}

/// Persisted representation of an access grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAccessGrant {
    /// Grant identifier.
    pub id: GrantId,
    /// Account owner that issued the grant.
    pub owner_id: UserId,
    /// Salted hash of the one-time token.
    pub token_hash: String,
    /// Redemption window in seconds from creation.
    pub ttl_seconds: i64,
    /// Expiry policy copied into the resulting relation.
    pub policy: ExpiryPolicy,
    /// Whether the grant can still be redeemed.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Guest that claimed the grant.
    pub claimed_by: Option<UserId>,
    /// Relation produced by the claim.
    pub relation_id: Option<RelationId>,
}

/// A one-time, token-protected offer of delegated access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    id: GrantId,
    owner_id: UserId,
    token_hash: String,
    ttl_seconds: i64,
    policy: ExpiryPolicy,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    claimed_by: Option<UserId>,
    relation_id: Option<RelationId>,
}

impl AccessGrant {
    /// Issues a new active grant.
    pub fn issue(
        owner_id: UserId,
        token_hash: impl Into<String>,
        ttl_seconds: i64,
        policy: ExpiryPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let grant = Self {
            id: GrantId::new(),
            owner_id,
            token_hash: token_hash.into(),
            ttl_seconds,
            policy,
            is_active: true,
            created_at: now,
            updated_at: now,
            claimed_by: None,
            relation_id: None,
        };

        grant.validate()?;
        Ok(grant)
    }

    /// Checks every grant invariant.
    pub fn validate(&self) -> AppResult<()> {
        self.policy.validate()?;

        if self.ttl_seconds <= 0 {
            return Err(AppError::Validation(
                "ttl_seconds must be greater than zero".to_owned(),
            ));
        }

        if self.ttl_seconds > MAX_GRANT_TTL_SECONDS {
            return Err(AppError::Validation(format!(
                "ttl_seconds must not exceed {MAX_GRANT_TTL_SECONDS}"
            )));
        }

        if self.token_hash.trim().is_empty() {
            return Err(AppError::Validation(
                "grant token hash must not be empty".to_owned(),
            ));
        }

        if self.claimed_by.is_some() != self.relation_id.is_some() {
            return Err(AppError::Validation(
                "claimed_by and relation_id must be set together".to_owned(),
            ));
        }

        if self.claimed_by.is_some() && self.is_active {
            return Err(AppError::Validation(
                "a claimed grant must be inactive".to_owned(),
            ));
        }

        if self.claimed_by == Some(self.owner_id) {
            return Err(AppError::Validation(
                "a grant cannot be claimed by its owner".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns the grant identifier.
    #[must_use]
    pub fn id(&self) -> GrantId {
        self.id
    }

    /// Returns the owner of the grant.
    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the salted hash of the one-time token.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        self.token_hash.as_str()
    }

    /// Returns the redemption window in seconds.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Returns the expiry policy.
    #[must_use]
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Returns whether the grant can still be redeemed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the guest that claimed the grant.
    #[must_use]
    pub fn claimed_by(&self) -> Option<UserId> {
        self.claimed_by
    }

    /// Returns the relation produced by the claim.
    #[must_use]
    pub fn relation_id(&self) -> Option<RelationId> {
        self.relation_id
    }

    /// Returns the end of the redemption window.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        // Rows read back from storage are not range-checked; saturate instead
        // of overflowing.
        Duration::try_seconds(self.ttl_seconds)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns whether the redemption window has closed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Returns the grant marked inactive and stamped with its claim.
    #[must_use]
    pub fn claimed(mut self, guest_id: UserId, relation_id: RelationId, now: DateTime<Utc>) -> Self {
        self.is_active = false;
        self.claimed_by = Some(guest_id);
        self.relation_id = Some(relation_id);
        self.updated_at = now;
        self
    }

    /// Returns the grant marked inactive without a claim.
    #[must_use]
    pub fn deactivated(mut self, now: DateTime<Utc>) -> Self {
        self.is_active = false;
        self.updated_at = now;
        self
    }
}

impl TryFrom<StoredAccessGrant> for AccessGrant {
    type Error = AppError;

    fn try_from(stored: StoredAccessGrant) -> AppResult<Self> {
        let grant = Self {
            id: stored.id,
            owner_id: stored.owner_id,
            token_hash: stored.token_hash,
            ttl_seconds: stored.ttl_seconds,
            policy: stored.policy,
            is_active: stored.is_active,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            claimed_by: stored.claimed_by,
            relation_id: stored.relation_id,
        };

        grant.validate()?;
        Ok(grant)
    }
}
