use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};
use tracing::{debug, instrument};

use super::{
    NewUser, RepoError, Repository, RequestEntry, RequestId, RequestLists, Result, UserId,
    UserProfile, UserSummary,
};

/// PostgreSQL-backed repository. Every statement checks a pooled connection out
/// and hands it back when the statement completes.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn requests_for(
        &self,
        user_id: UserId,
        closed: bool,
        outgoing: bool,
    ) -> Result<Vec<RequestEntry>> {
        // The counterpart is whoever sits on the other end of the request.
        let sql = if outgoing {
            r#"
            SELECT r.id AS request_id, s.skill_name::TEXT AS skill,
                   u.first_name::TEXT AS counterpart_first_name,
                   u.second_name::TEXT AS counterpart_second_name,
                   r.open_date, r.close_date
              FROM requests r
              JOIN users u ON r.receiver_id = u.id
              JOIN skills s ON r.skill_id = s.id
             WHERE r.sender_id = $1 AND r.completed = $2
             ORDER BY r.open_date, r.id
            "#
        } else {
            r#"
            SELECT r.id AS request_id, s.skill_name::TEXT AS skill,
                   u.first_name::TEXT AS counterpart_first_name,
                   u.second_name::TEXT AS counterpart_second_name,
                   r.open_date, r.close_date
              FROM requests r
              JOIN users u ON r.sender_id = u.id
              JOIN skills s ON r.skill_id = s.id
             WHERE r.receiver_id = $1 AND r.completed = $2
             ORDER BY r.open_date, r.id
            "#
        };
        let rows = sqlx::query_as::<_, RequestEntry>(sql)
            .bind(user_id)
            .bind(closed)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_user_column(&self, column: UserColumn, user_id: UserId, value: &str) -> Result<()> {
        let sql = match column {
            UserColumn::FirstName => "UPDATE users SET first_name = $1 WHERE id = $2",
            UserColumn::SecondName => "UPDATE users SET second_name = $1 WHERE id = $2",
            UserColumn::Phone => "UPDATE users SET phone = $1 WHERE id = $2",
            UserColumn::Location => "UPDATE users SET location = $1 WHERE id = $2",
            UserColumn::PasswordHash => "UPDATE users SET password_hash = $1 WHERE id = $2",
        };
        debug!(?column, user_id, "update user");
        sqlx::query(sql)
            .bind(value)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum UserColumn {
    FirstName,
    SecondName,
    Phone,
    Location,
    PasswordHash,
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
pub(crate) fn like_substring(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

async fn link_skill(conn: &mut PgConnection, skill_name: &str, user_id: UserId) -> Result<()> {
    let skill_id = sqlx::query_scalar::<_, i32>("SELECT id FROM skills WHERE skill_name = $1")
        .bind(skill_name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepoError::UnknownSkill(skill_name.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO skills_users (user_id, skill_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, skill_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(skill_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Repository for PgRepository {
    #[instrument(skip(self, user), fields(email = %user.email), level = "debug")]
    async fn create_user(&self, user: &NewUser) -> Result<UserId> {
        let inserted = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (first_name, second_name, email, phone, location, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.second_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RepoError::DuplicateEmail(user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<UserId>> {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn password_hash(&self, email: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    #[instrument(skip(self), level = "debug")]
    async fn user_profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.first_name::TEXT AS first_name, u.second_name::TEXT AS second_name,
                   u.email, u.phone::TEXT AS phone, u.location,
                   COALESCE(
                       ARRAY_AGG(s.skill_name::TEXT ORDER BY s.skill_name)
                           FILTER (WHERE s.skill_name IS NOT NULL),
                       '{}'::TEXT[]
                   ) AS skills
              FROM users u
              LEFT JOIN skills_users su ON u.id = su.user_id
              LEFT JOIN skills s ON su.skill_id = s.id
             WHERE u.id = $1
             GROUP BY u.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    #[instrument(skip(self), level = "debug")]
    async fn search_users_by_skill(&self, pattern: &str) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.first_name::TEXT AS first_name, u.second_name::TEXT AS second_name,
                   u.email, u.location,
                   ARRAY(
                       SELECT s.skill_name::TEXT
                         FROM skills_users su
                         JOIN skills s ON su.skill_id = s.id
                        WHERE su.user_id = u.id
                        ORDER BY s.skill_name
                   ) AS skills
              FROM users u
             WHERE EXISTS (
                   SELECT 1
                     FROM skills_users su
                     JOIN skills s ON su.skill_id = s.id
                    WHERE su.user_id = u.id
                      AND s.skill_name ILIKE $1 ESCAPE '\'
             )
             ORDER BY u.id
            "#,
        )
        .bind(like_substring(pattern))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_requests(&self, user_id: UserId, closed: bool) -> Result<RequestLists> {
        Ok(RequestLists {
            outgoing: self.requests_for(user_id, closed, true).await?,
            incoming: self.requests_for(user_id, closed, false).await?,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn close_request(&self, request_id: RequestId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE requests
               SET close_date = NOW(),
                   completed = TRUE
             WHERE id = $1
            "#,
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_first_name(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user_column(UserColumn::FirstName, user_id, value).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_second_name(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user_column(UserColumn::SecondName, user_id, value).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_phone(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user_column(UserColumn::Phone, user_id, value).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn update_location(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user_column(UserColumn::Location, user_id, value).await
    }

    #[instrument(skip(self, hash), level = "debug")]
    async fn update_password_hash(&self, user_id: UserId, hash: &str) -> Result<()> {
        self.update_user_column(UserColumn::PasswordHash, user_id, hash).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove_skill_from_user(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM skills_users su
             USING skills s
             WHERE su.skill_id = s.id
               AND su.user_id = $1
               AND s.skill_name = $2
            "#,
        )
        .bind(user_id)
        .bind(skill_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn all_skill_names(&self) -> Result<Vec<String>> {
        let names =
            sqlx::query_scalar::<_, String>("SELECT skill_name::TEXT FROM skills ORDER BY skill_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    #[instrument(skip(self), level = "debug")]
    async fn create_skill(&self, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO skills (skill_name) VALUES ($1) ON CONFLICT (skill_name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn add_skill_to_user(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        link_skill(&mut conn, skill_name, user_id).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn attach_skill(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO skills (skill_name) VALUES ($1) ON CONFLICT (skill_name) DO NOTHING")
            .bind(skill_name)
            .execute(&mut *tx)
            .await?;
        link_skill(&mut tx, skill_name, user_id).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, comment), level = "debug")]
    async fn create_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        skill_name: &str,
        comment: &str,
    ) -> Result<RequestId> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO requests (sender_id, receiver_id, skill_id, request_info)
            SELECT $1, $2, s.id, $4
              FROM skills s
             WHERE s.skill_name = $3
            RETURNING id
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(skill_name)
        .bind(comment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::UnknownSkill(skill_name.to_string()))?;
        Ok(id)
    }

    #[instrument(skip(self), level = "debug")]
    async fn user_exists(&self, id: UserId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self), level = "debug")]
    async fn user_owns_request(&self, user_id: UserId, request_id: RequestId) -> Result<bool> {
        let owns = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM requests WHERE sender_id = $1 AND id = $2)",
        )
        .bind(user_id)
        .bind(request_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owns)
    }

    #[instrument(skip(self), level = "debug")]
    async fn user_has_skill(&self, user_id: UserId, skill_name: &str) -> Result<bool> {
        let has = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                  FROM skills_users su
                  JOIN skills s ON su.skill_id = s.id
                 WHERE su.user_id = $1 AND s.skill_name = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(skill_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(has)
    }
}
