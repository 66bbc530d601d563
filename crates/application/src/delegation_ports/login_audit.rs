use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keyshare_core::{AppResult, RelationId, SessionClaims, UserId};

/// Request details captured alongside a login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginContext {
    /// Remote address reported by the proxy.
    pub ip_address: Option<String>,
    /// Browser user agent.
    pub user_agent: Option<String>,
}

/// Login audit entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoginAudit {
    /// Account the session acts upon.
    pub account_id: UserId,
    /// Person holding the credential.
    pub surrogate_id: UserId,
    /// Relation used for a guest login.
    pub relation_id: Option<RelationId>,
    /// Request details.
    pub context: LoginContext,
}

impl NewLoginAudit {
    /// Creates an audit entry describing the given session claims.
    #[must_use]
    pub fn for_claims(claims: &SessionClaims, context: LoginContext) -> Self {
        Self {
            account_id: claims.subject(),
            surrogate_id: claims.surrogate(),
            relation_id: claims.grant(),
            context,
        }
    }
}

/// Stored login audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAuditRecord {
    /// Entry identifier.
    pub id: i64,
    /// Account the session acted upon.
    pub account_id: UserId,
    /// Person holding the credential.
    pub surrogate_id: UserId,
    /// Relation used for a guest login.
    pub relation_id: Option<RelationId>,
    /// Remote address reported by the proxy.
    pub ip_address: Option<String>,
    /// Browser user agent.
    pub user_agent: Option<String>,
    /// Login time.
    pub created_at: DateTime<Utc>,
}

/// Repository port for the login audit trail.
#[async_trait]
pub trait LoginAuditRepository: Send + Sync {
    /// Appends a login entry.
    async fn record_login(&self, entry: NewLoginAudit, at: DateTime<Utc>) -> AppResult<()>;

    /// Counts guest logins made through a relation.
    async fn count_relation_logins(&self, relation_id: RelationId) -> AppResult<i64>;

    /// Appends a guest login through `entry.relation_id` only while the
    /// relation's login allowance has a slot left.
    ///
    /// The count and the insert happen as one step, so concurrent callers
    /// never share a slot. Returns `false` without writing when the
    /// allowance is spent. `None` means the relation has no login bound.
    async fn reserve_relation_login(
        &self,
        entry: NewLoginAudit,
        logins_allowed: Option<u32>,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Lists logins where the account was acted upon or acted as guest,
    /// newest first.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<LoginAuditRecord>>;
}
