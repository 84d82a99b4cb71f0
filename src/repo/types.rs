use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

pub type UserId = i32;
pub type RequestId = i32;

/// Fields needed to register a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub password_hash: String,
}

/// Full profile of one user, including every skill they list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub skills: Vec<String>,
}

/// Search hit: a user with at least one matching skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub second_name: String,
    pub email: String,
    pub location: String,
    pub skills: Vec<String>,
}

/// One help request as seen by one of its two parties.
/// The counterpart is the receiver for outgoing entries and the sender for incoming ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RequestEntry {
    pub request_id: RequestId,
    pub skill: String,
    pub counterpart_first_name: String,
    pub counterpart_second_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub open_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub close_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestLists {
    pub outgoing: Vec<RequestEntry>,
    pub incoming: Vec<RequestEntry>,
}
