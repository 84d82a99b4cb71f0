use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    NewUser, RepoError, Repository, RequestEntry, RequestId, RequestLists, Result, UserId,
    UserProfile, UserSummary,
};

struct UserRow {
    id: UserId,
    first_name: String,
    second_name: String,
    email: String,
    phone: String,
    location: String,
    password_hash: String,
}

struct RequestRow {
    id: RequestId,
    sender_id: UserId,
    receiver_id: UserId,
    skill_id: i32,
    #[allow(dead_code)]
    comment: String,
    open_date: OffsetDateTime,
    close_date: Option<OffsetDateTime>,
    completed: bool,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    skills: Vec<(i32, String)>,
    // (user_id, skill_id)
    skills_users: BTreeSet<(UserId, i32)>,
    requests: Vec<RequestRow>,
}

impl Tables {
    fn skill_id(&self, name: &str) -> Option<i32> {
        self.skills.iter().find(|(_, n)| n == name).map(|(id, _)| *id)
    }

    fn skill_name(&self, id: i32) -> &str {
        self.skills
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, n)| n.as_str())
            .unwrap_or_default()
    }

    fn user(&self, id: UserId) -> Option<&UserRow> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: UserId) -> Option<&mut UserRow> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn skills_of(&self, user_id: UserId) -> Vec<String> {
        let mut names: Vec<String> = self
            .skills_users
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, sid)| self.skill_name(*sid).to_string())
            .collect();
        names.sort();
        names
    }

    fn insert_skill(&mut self, name: &str) {
        if self.skill_id(name).is_none() {
            let id = self.skills.len() as i32 + 1;
            self.skills.push((id, name.to_string()));
        }
    }

    fn link_skill(&mut self, name: &str, user_id: UserId) -> Result<()> {
        let skill_id = self
            .skill_id(name)
            .ok_or_else(|| RepoError::UnknownSkill(name.to_string()))?;
        self.skills_users.insert((user_id, skill_id));
        Ok(())
    }

    fn entry(&self, row: &RequestRow, counterpart: UserId) -> RequestEntry {
        let (first, second) = self
            .user(counterpart)
            .map(|u| (u.first_name.clone(), u.second_name.clone()))
            .unwrap_or_default();
        RequestEntry {
            request_id: row.id,
            skill: self.skill_name(row.skill_id).to_string(),
            counterpart_first_name: first,
            counterpart_second_name: second,
            open_date: row.open_date,
            close_date: row.close_date,
        }
    }
}

/// In-memory implementation of `Repository` for tests.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a user with their skill links and requests, as the foreign keys cascade.
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        let mut tables = self.write()?;
        tables.users.retain(|u| u.id != id);
        tables.skills_users.retain(|(uid, _)| *uid != id);
        tables
            .requests
            .retain(|r| r.sender_id != id && r.receiver_id != id);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepoError::Storage(sqlx::Error::PoolClosed))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepoError::Storage(sqlx::Error::PoolClosed))
    }

    fn update_user(&self, user_id: UserId, apply: impl FnOnce(&mut UserRow)) -> Result<()> {
        if let Some(user) = self.write()?.user_mut(user_id) {
            apply(user);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: &NewUser) -> Result<UserId> {
        let mut tables = self.write()?;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail(user.email.clone()));
        }
        let id = tables.users.len() as i32 + 1;
        tables.users.push(UserRow {
            id,
            first_name: user.first_name.clone(),
            second_name: user.second_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            location: user.location.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(id)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<UserId>> {
        Ok(self.read()?.users.iter().find(|u| u.email == email).map(|u| u.id))
    }

    async fn password_hash(&self, email: &str) -> Result<Option<String>> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.password_hash.clone()))
    }

    async fn user_profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let tables = self.read()?;
        Ok(tables.user(id).map(|u| UserProfile {
            id: u.id,
            first_name: u.first_name.clone(),
            second_name: u.second_name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            location: u.location.clone(),
            skills: tables.skills_of(u.id),
        }))
    }

    async fn search_users_by_skill(&self, pattern: &str) -> Result<Vec<UserSummary>> {
        let tables = self.read()?;
        let needle = pattern.to_lowercase();
        let hits = tables
            .users
            .iter()
            .filter_map(|u| {
                let skills = tables.skills_of(u.id);
                skills
                    .iter()
                    .any(|s| s.to_lowercase().contains(&needle))
                    .then(|| UserSummary {
                        id: u.id,
                        first_name: u.first_name.clone(),
                        second_name: u.second_name.clone(),
                        email: u.email.clone(),
                        location: u.location.clone(),
                        skills,
                    })
            })
            .collect();
        Ok(hits)
    }

    async fn list_requests(&self, user_id: UserId, closed: bool) -> Result<RequestLists> {
        let tables = self.read()?;
        let matching = |r: &&RequestRow| r.completed == closed;
        let outgoing = tables
            .requests
            .iter()
            .filter(|r| r.sender_id == user_id)
            .filter(matching)
            .map(|r| tables.entry(r, r.receiver_id))
            .collect();
        let incoming = tables
            .requests
            .iter()
            .filter(|r| r.receiver_id == user_id)
            .filter(matching)
            .map(|r| tables.entry(r, r.sender_id))
            .collect();
        Ok(RequestLists { outgoing, incoming })
    }

    async fn close_request(&self, request_id: RequestId) -> Result<()> {
        let mut tables = self.write()?;
        if let Some(row) = tables.requests.iter_mut().find(|r| r.id == request_id) {
            row.close_date = Some(OffsetDateTime::now_utc());
            row.completed = true;
        }
        Ok(())
    }

    async fn update_first_name(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user(user_id, |u| u.first_name = value.to_string())
    }

    async fn update_second_name(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user(user_id, |u| u.second_name = value.to_string())
    }

    async fn update_phone(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user(user_id, |u| u.phone = value.to_string())
    }

    async fn update_location(&self, user_id: UserId, value: &str) -> Result<()> {
        self.update_user(user_id, |u| u.location = value.to_string())
    }

    async fn update_password_hash(&self, user_id: UserId, hash: &str) -> Result<()> {
        self.update_user(user_id, |u| u.password_hash = hash.to_string())
    }

    async fn remove_skill_from_user(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        let mut tables = self.write()?;
        if let Some(skill_id) = tables.skill_id(skill_name) {
            tables.skills_users.remove(&(user_id, skill_id));
        }
        Ok(())
    }

    async fn all_skill_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read()?.skills.iter().map(|(_, n)| n.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn create_skill(&self, name: &str) -> Result<()> {
        self.write()?.insert_skill(name);
        Ok(())
    }

    async fn add_skill_to_user(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        self.write()?.link_skill(skill_name, user_id)
    }

    async fn attach_skill(&self, skill_name: &str, user_id: UserId) -> Result<()> {
        let mut tables = self.write()?;
        tables.insert_skill(skill_name);
        tables.link_skill(skill_name, user_id)
    }

    async fn create_request(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        skill_name: &str,
        comment: &str,
    ) -> Result<RequestId> {
        let mut tables = self.write()?;
        let skill_id = tables
            .skill_id(skill_name)
            .ok_or_else(|| RepoError::UnknownSkill(skill_name.to_string()))?;
        let id = tables.requests.len() as i32 + 1;
        tables.requests.push(RequestRow {
            id,
            sender_id,
            receiver_id,
            skill_id,
            comment: comment.to_string(),
            open_date: OffsetDateTime::now_utc(),
            close_date: None,
            completed: false,
        });
        Ok(id)
    }

    async fn user_exists(&self, id: UserId) -> Result<bool> {
        Ok(self.read()?.user(id).is_some())
    }

    async fn user_owns_request(&self, user_id: UserId, request_id: RequestId) -> Result<bool> {
        Ok(self
            .read()?
            .requests
            .iter()
            .any(|r| r.id == request_id && r.sender_id == user_id))
    }

    async fn user_has_skill(&self, user_id: UserId, skill_name: &str) -> Result<bool> {
        let tables = self.read()?;
        Ok(tables
            .skill_id(skill_name)
            .is_some_and(|sid| tables.skills_users.contains(&(user_id, sid))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, second: &str, email: &str) -> NewUser {
        NewUser {
            first_name: first.into(),
            second_name: second.into(),
            email: email.into(),
            phone: String::new(),
            location: "Kyiv".into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let repo = MemoryRepository::new();
        let id = repo
            .create_user(&user("Dariia", "Vyshenska", "vysh@gmail.com"))
            .await
            .unwrap();

        assert_eq!(repo.find_user_id_by_email("vysh@gmail.com").await.unwrap(), Some(id));
        assert_eq!(repo.find_user_id_by_email("VYSH@gmail.com").await.unwrap(), None);
        assert_eq!(
            repo.password_hash("vysh@gmail.com").await.unwrap().as_deref(),
            Some("hash")
        );
        assert!(repo.user_exists(id).await.unwrap());
        assert!(!repo.user_exists(id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user(&user("A", "B", "a@b.c")).await.unwrap();
        let err = repo.create_user(&user("C", "D", "a@b.c")).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn skills_are_shared_and_listed_in_order() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&user("A", "A", "a@x.io")).await.unwrap();
        let b = repo.create_user(&user("B", "B", "b@x.io")).await.unwrap();

        repo.attach_skill("sql", a).await.unwrap();
        repo.attach_skill("cooking", a).await.unwrap();
        repo.attach_skill("sql", b).await.unwrap();

        assert_eq!(repo.all_skill_names().await.unwrap(), vec!["cooking", "sql"]);
        let profile = repo.user_profile(a).await.unwrap().unwrap();
        assert_eq!(profile.skills, vec!["cooking", "sql"]);
        assert!(repo.user_has_skill(b, "sql").await.unwrap());
        assert!(!repo.user_has_skill(b, "cooking").await.unwrap());

        repo.remove_skill_from_user("sql", a).await.unwrap();
        repo.remove_skill_from_user("sql", a).await.unwrap();
        assert_eq!(repo.user_profile(a).await.unwrap().unwrap().skills, vec!["cooking"]);
        // the skill itself survives for other users
        assert_eq!(repo.all_skill_names().await.unwrap(), vec!["cooking", "sql"]);
    }

    #[tokio::test]
    async fn add_unknown_skill_fails() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&user("A", "A", "a@x.io")).await.unwrap();
        let err = repo.add_skill_to_user("rust", a).await.unwrap_err();
        assert!(matches!(err, RepoError::UnknownSkill(name) if name == "rust"));

        repo.create_skill("rust").await.unwrap();
        repo.create_skill("rust").await.unwrap();
        repo.add_skill_to_user("rust", a).await.unwrap();
        assert_eq!(repo.all_skill_names().await.unwrap(), vec!["rust"]);
    }

    #[tokio::test]
    async fn search_matches_substring_ignoring_case() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&user("Dariia", "Vyshenska", "a@x.io")).await.unwrap();
        let b = repo.create_user(&user("Oleksii", "Motorykin", "b@x.io")).await.unwrap();
        repo.attach_skill("sql", a).await.unwrap();
        repo.attach_skill("lsms", b).await.unwrap();
        repo.attach_skill("science", b).await.unwrap();
        repo.attach_skill("cooking", b).await.unwrap();

        let hits = repo.search_users_by_skill("S").await.unwrap();
        assert_eq!(hits.len(), 2);
        let oleksii = hits.iter().find(|h| h.id == b).unwrap();
        assert_eq!(oleksii.skills, vec!["cooking", "lsms", "science"]);

        assert!(repo.search_users_by_skill("timothy").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn requests_partition_by_completion() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&user("Dariia", "Vyshenska", "a@x.io")).await.unwrap();
        let b = repo.create_user(&user("Oleksii", "Motorykin", "b@x.io")).await.unwrap();
        repo.attach_skill("science", a).await.unwrap();

        let id = repo.create_request(b, a, "science", "need help").await.unwrap();
        assert!(repo.user_owns_request(b, id).await.unwrap());
        assert!(!repo.user_owns_request(a, id).await.unwrap());

        let open = repo.list_requests(a, false).await.unwrap();
        assert_eq!(open.incoming.len(), 1);
        assert!(open.outgoing.is_empty());
        assert_eq!(open.incoming[0].skill, "science");
        assert_eq!(open.incoming[0].counterpart_first_name, "Oleksii");

        let sent = repo.list_requests(b, false).await.unwrap();
        assert_eq!(sent.outgoing[0].counterpart_first_name, "Dariia");

        repo.close_request(id).await.unwrap();
        assert_eq!(repo.list_requests(a, false).await.unwrap(), RequestLists::default());
        let closed = repo.list_requests(a, true).await.unwrap();
        assert_eq!(closed.incoming.len(), 1);
        assert!(closed.incoming[0].close_date.is_some());
    }

    #[tokio::test]
    async fn request_with_unknown_skill_fails() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&user("A", "A", "a@x.io")).await.unwrap();
        let b = repo.create_user(&user("B", "B", "b@x.io")).await.unwrap();
        let err = repo.create_request(a, b, "ghost", "").await.unwrap_err();
        assert!(matches!(err, RepoError::UnknownSkill(_)));
    }
}
