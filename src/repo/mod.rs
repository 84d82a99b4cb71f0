use async_trait::async_trait;

#[cfg(test)]
pub mod memory;
pub mod pg;
mod types;

#[cfg(test)]
pub use memory::MemoryRepository;
pub use pg::PgRepository;
pub use types::{NewUser, RequestEntry, RequestId, RequestLists, UserId, UserProfile, UserSummary};

pub type Result<T> = std::result::Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Connection loss or a failed statement. Never retried.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    #[error("email already registered: {0}")]
    DuplicateEmail(String),
}

/// Data access for users, skills and help requests.
///
/// Implementations perform no business rules beyond existence checks;
/// callers validate and authorize before writing.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a user row. Callers pre-check the email with `find_user_id_by_email`;
    /// a concurrent duplicate surfaces as `RepoError::DuplicateEmail`.
    async fn create_user(&self, user: &NewUser) -> Result<UserId>;

    /// Exact match on the stored (already normalized) email.
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<UserId>>;

    async fn password_hash(&self, email: &str) -> Result<Option<String>>;

    async fn user_profile(&self, id: UserId) -> Result<Option<UserProfile>>;

    /// Case-insensitive substring match against skill names. Each matching user
    /// appears once, carrying all of their skills.
    async fn search_users_by_skill(&self, pattern: &str) -> Result<Vec<UserSummary>>;

    /// Requests sent (`outgoing`) and received (`incoming`) by `user_id`,
    /// filtered on the completion flag.
    async fn list_requests(&self, user_id: UserId, closed: bool) -> Result<RequestLists>;

    /// Stamps the close date and marks the request completed.
    async fn close_request(&self, request_id: RequestId) -> Result<()>;

    async fn update_first_name(&self, user_id: UserId, value: &str) -> Result<()>;
    async fn update_second_name(&self, user_id: UserId, value: &str) -> Result<()>;
    async fn update_phone(&self, user_id: UserId, value: &str) -> Result<()>;
    async fn update_location(&self, user_id: UserId, value: &str) -> Result<()>;
    async fn update_password_hash(&self, user_id: UserId, hash: &str) -> Result<()>;

    /// No-op when the user does not list the skill.
    async fn remove_skill_from_user(&self, skill_name: &str, user_id: UserId) -> Result<()>;

    async fn all_skill_names(&self) -> Result<Vec<String>>;

    /// Inserts the skill unless it already exists.
    async fn create_skill(&self, name: &str) -> Result<()>;

    /// Fails with `RepoError::UnknownSkill` when no skill has that name.
    async fn add_skill_to_user(&self, skill_name: &str, user_id: UserId) -> Result<()>;

    /// Creates the skill if needed and links it to the user in one transaction.
    async fn attach_skill(&self, skill_name: &str, user_id: UserId) -> Result<()>;

    /// Opens a request stamped with the current time.
    async fn create_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        skill_name: &str,
        comment: &str,
    ) -> Result<RequestId>;

    async fn user_exists(&self, id: UserId) -> Result<bool>;

    /// True iff `user_id` sent the request.
    async fn user_owns_request(&self, user_id: UserId, request_id: RequestId) -> Result<bool>;

    async fn user_has_skill(&self, user_id: UserId, skill_name: &str) -> Result<bool>;
}
