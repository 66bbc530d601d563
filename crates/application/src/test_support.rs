//! Hand-written port fakes shared by service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use keyshare_core::{AppError, AppResult, GrantId, PostId, RelationId, UserId};
use keyshare_domain::{AccessGrant, EmailAddress, GuestRelation, Post};

use crate::{
    AccountService, Clock, DeactivationReport, DelegatedSessionIssuer, EmailService,
    GrantLifecycleService, GrantStore, GuestAccessService, LoginAuditRecord,
    LoginAuditRepository, NewLoginAudit, PostRepository, PostService, SecretHasher,
    SessionSigner, SignedSession, UserDirectory, UserRecord,
};

fn lock<T>(mutex: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|error| AppError::Internal(format!("failed to lock fake state: {error}")))
}

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            now: Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

#[derive(Default)]
pub(crate) struct FakeGrantStore {
    grants: Mutex<HashMap<GrantId, AccessGrant>>,
    relations: Mutex<HashMap<RelationId, GuestRelation>>,
}

impl FakeGrantStore {
    pub(crate) fn relations(&self) -> Vec<GuestRelation> {
        self.relations
            .lock()
            .map(|relations| relations.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert_relation(&self, relation: GuestRelation) {
        if let Ok(mut relations) = self.relations.lock() {
            relations.insert(relation.id(), relation);
        }
    }
}

#[async_trait]
impl GrantStore for FakeGrantStore {
    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        Ok(lock(&self.grants)?.get(&grant_id).cloned())
    }

    async fn create_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        lock(&self.grants)?.insert(grant.id(), grant.clone());
        Ok(())
    }

    async fn update_grant(&self, grant: &AccessGrant) -> AppResult<()> {
        grant.validate()?;
        lock(&self.grants)?.insert(grant.id(), grant.clone());
        Ok(())
    }

    async fn find_relation(&self, relation_id: RelationId) -> AppResult<Option<GuestRelation>> {
        Ok(lock(&self.relations)?.get(&relation_id).cloned())
    }

    async fn update_relation(&self, relation: &GuestRelation) -> AppResult<()> {
        relation.validate()?;
        lock(&self.relations)?.insert(relation.id(), relation.clone());
        Ok(())
    }

    async fn relations_by_guest(&self, guest_id: UserId) -> AppResult<Vec<GuestRelation>> {
        Ok(lock(&self.relations)?
            .values()
            .filter(|relation| relation.guest_id() == guest_id)
            .cloned()
            .collect())
    }

    async fn relations_by_parent(&self, parent_id: UserId) -> AppResult<Vec<GuestRelation>> {
        Ok(lock(&self.relations)?
            .values()
            .filter(|relation| relation.parent_id() == parent_id)
            .cloned()
            .collect())
    }

    async fn find_active_relation(
        &self,
        parent_id: UserId,
        guest_id: UserId,
    ) -> AppResult<Option<GuestRelation>> {
        Ok(lock(&self.relations)?
            .values()
            .find(|relation| relation.is_active() && relation.links(parent_id, guest_id))
            .cloned())
    }

    async fn claim_grant(&self, claimed: &AccessGrant, relation: &GuestRelation) -> AppResult<()> {
        claimed.validate()?;
        relation.validate()?;

        let mut grants = lock(&self.grants)?;
        let mut relations = lock(&self.relations)?;

        if !grants
            .get(&claimed.id())
            .is_some_and(AccessGrant::is_active)
        {
            return Err(AppError::NotFound("access grant not found".to_owned()));
        }

        if relations.values().any(|existing| {
            existing.is_active() && existing.links(relation.parent_id(), relation.guest_id())
        }) {
            return Err(AppError::Conflict("guest relation already exists".to_owned()));
        }

        grants.insert(claimed.id(), claimed.clone());
        relations.insert(relation.id(), relation.clone());
        Ok(())
    }

    async fn deactivate_for_owner(
        &self,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<DeactivationReport> {
        let mut report = DeactivationReport::default();
        let mut grants = lock(&self.grants)?;
        for grant in grants.values_mut() {
            if grant.owner_id() == owner_id && grant.is_active() {
                *grant = grant.clone().deactivated(now);
                report.grants += 1;
            }
        }

        let mut relations = lock(&self.relations)?;
        for relation in relations.values_mut() {
            if relation.parent_id() == owner_id && relation.is_active() {
                *relation = relation.clone().deactivated(now);
                report.relations += 1;
            }
        }

        Ok(report)
    }

    async fn deactivate_lapsed(&self, now: DateTime<Utc>) -> AppResult<DeactivationReport> {
        let mut report = DeactivationReport::default();
        let mut grants = lock(&self.grants)?;
        for grant in grants.values_mut() {
            if grant.is_active() && grant.is_expired(now) {
                *grant = grant.clone().deactivated(now);
                report.grants += 1;
            }
        }

        let mut relations = lock(&self.relations)?;
        for relation in relations.values_mut() {
            if relation.is_active() && relation.is_time_exhausted(now) {
                *relation = relation.clone().deactivated(now);
                report.relations += 1;
            }
        }

        Ok(report)
    }
}

#[derive(Default)]
pub(crate) struct FakeUserDirectory {
    users: Mutex<Vec<UserRecord>>,
}

impl FakeUserDirectory {
    pub(crate) fn add(&self, email: &str) -> UserId {
        let user_id = UserId::new();
        if let Ok(mut users) = self.users.lock() {
            users.push(UserRecord {
                id: user_id,
                email: email.to_owned(),
                created_at: Utc::now(),
            });
        }
        user_id
    }
}

#[async_trait]
impl UserDirectory for FakeUserDirectory {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        Ok(lock(&self.users)?
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<UserRecord>> {
        Ok(lock(&self.users)?
            .iter()
            .find(|user| user.email == email.as_str())
            .cloned())
    }

    async fn create_user(&self, email: &EmailAddress) -> AppResult<UserRecord> {
        let mut users = lock(&self.users)?;
        if users.iter().any(|user| user.email == email.as_str()) {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let record = UserRecord {
            id: UserId::new(),
            email: email.as_str().to_owned(),
            created_at: Utc::now(),
        };
        users.push(record.clone());
        Ok(record)
    }
}

pub(crate) struct PrefixHasher;

impl SecretHasher for PrefixHasher {
    fn hash_secret(&self, secret: &str) -> AppResult<String> {
        Ok(format!("hashed:{secret}"))
    }

    fn verify_secret(&self, secret: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("hashed:") == Some(secret))
    }
}

#[derive(Default)]
pub(crate) struct TableSigner {
    sessions: Mutex<HashMap<String, SignedSession>>,
}

impl SessionSigner for TableSigner {
    fn sign(&self, session: &SignedSession) -> AppResult<String> {
        let mut sessions = lock(&self.sessions)?;
        let token = format!("session-{}", sessions.len());
        sessions.insert(token.clone(), *session);
        Ok(token)
    }

    fn verify(&self, token: &str) -> AppResult<SignedSession> {
        lock(&self.sessions)?
            .get(token)
            .copied()
            .ok_or_else(|| AppError::Unauthorized("invalid session token".to_owned()))
    }
}

#[derive(Default)]
pub(crate) struct RecordingEmailService {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEmailService {
    pub(crate) fn sent(&self) -> Vec<(String, String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send_email(&self, to: &str, subject: &str, text_body: &str) -> AppResult<()> {
        lock(&self.sent)?.push((to.to_owned(), subject.to_owned(), text_body.to_owned()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeLoginAudit {
    entries: Mutex<Vec<LoginAuditRecord>>,
}

#[async_trait]
impl LoginAuditRepository for FakeLoginAudit {
    async fn record_login(&self, entry: NewLoginAudit, at: DateTime<Utc>) -> AppResult<()> {
        let mut entries = lock(&self.entries)?;
        let id = i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1;
        entries.push(LoginAuditRecord {
            id,
            account_id: entry.account_id,
            surrogate_id: entry.surrogate_id,
            relation_id: entry.relation_id,
            ip_address: entry.context.ip_address,
            user_agent: entry.context.user_agent,
            created_at: at,
        });
        Ok(())
    }

    async fn count_relation_logins(&self, relation_id: RelationId) -> AppResult<i64> {
        tokio::task::yield_now().await;
        let count = lock(&self.entries)?
            .iter()
            .filter(|entry| entry.relation_id == Some(relation_id))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn reserve_relation_login(
        &self,
        entry: NewLoginAudit,
        logins_allowed: Option<u32>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        // Yield first so concurrent callers interleave before taking the lock.
        tokio::task::yield_now().await;

        let mut entries = lock(&self.entries)?;
        let used = entries
            .iter()
            .filter(|stored| stored.relation_id.is_some() && stored.relation_id == entry.relation_id)
            .count();
        if logins_allowed.is_some_and(|allowed| used >= usize::try_from(allowed).unwrap_or(usize::MAX)) {
            return Ok(false);
        }

        let id = i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1;
        entries.push(LoginAuditRecord {
            id,
            account_id: entry.account_id,
            surrogate_id: entry.surrogate_id,
            relation_id: entry.relation_id,
            ip_address: entry.context.ip_address,
            user_agent: entry.context.user_agent,
            created_at: at,
        });
        Ok(true)
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<LoginAuditRecord>> {
        let mut entries: Vec<LoginAuditRecord> = lock(&self.entries)?
            .iter()
            .filter(|entry| entry.account_id == user_id || entry.surrogate_id == user_id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

#[derive(Default)]
pub(crate) struct FakePostRepository {
    posts: Mutex<Vec<Post>>,
}

#[async_trait]
impl PostRepository for FakePostRepository {
    async fn create_post(&self, post: &Post) -> AppResult<()> {
        post.validate()?;
        lock(&self.posts)?.push(post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> AppResult<()> {
        post.validate()?;
        let mut posts = lock(&self.posts)?;
        let stored = posts
            .iter_mut()
            .find(|stored| stored.id() == post.id())
            .ok_or_else(|| AppError::NotFound("post not found".to_owned()))?;
        *stored = post.clone();
        Ok(())
    }

    async fn find_post(&self, post_id: PostId) -> AppResult<Option<Post>> {
        Ok(lock(&self.posts)?
            .iter()
            .find(|post| post.id() == post_id)
            .cloned())
    }

    async fn list_for_account(&self, account_id: UserId, limit: u32) -> AppResult<Vec<Post>> {
        let mut posts: Vec<Post> = lock(&self.posts)?
            .iter()
            .rev()
            .filter(|post| post.is_active() && post.account_id() == account_id)
            .cloned()
            .collect();
        posts.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        posts.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(posts)
    }
}

/// Every service wired to the same set of fakes.
pub(crate) struct Harness {
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) store: Arc<FakeGrantStore>,
    pub(crate) users: Arc<FakeUserDirectory>,
    pub(crate) email: Arc<RecordingEmailService>,
    pub(crate) audit: Arc<FakeLoginAudit>,
    pub(crate) issuer: DelegatedSessionIssuer,
    pub(crate) lifecycle: GrantLifecycleService,
    pub(crate) guest_access: GuestAccessService,
    pub(crate) accounts: AccountService,
    pub(crate) posts: PostService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(FakeGrantStore::default());
        let users = Arc::new(FakeUserDirectory::default());
        let email = Arc::new(RecordingEmailService::default());
        let audit = Arc::new(FakeLoginAudit::default());

        let issuer = DelegatedSessionIssuer::new(
            Arc::new(TableSigner::default()),
            store.clone(),
            users.clone(),
            clock.clone(),
            Duration::minutes(60),
        );
        let lifecycle = GrantLifecycleService::new(
            store.clone(),
            users.clone(),
            Arc::new(PrefixHasher),
            email.clone(),
            clock.clone(),
            "http://localhost:3000".to_owned(),
            900,
        );
        let guest_access = GuestAccessService::new(
            store.clone(),
            audit.clone(),
            issuer.clone(),
            clock.clone(),
        );
        let accounts = AccountService::new(users.clone(), audit.clone(), issuer.clone(), clock.clone());
        let posts = PostService::new(
            Arc::new(FakePostRepository::default()),
            users.clone(),
            clock.clone(),
        );

        Self {
            clock,
            store,
            users,
            email,
            audit,
            issuer,
            lifecycle,
            guest_access,
            accounts,
            posts,
        }
    }
}
