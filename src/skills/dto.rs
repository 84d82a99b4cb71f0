use serde::{Deserialize, Serialize};

use crate::repo::UserSummary;

#[derive(Debug, Serialize)]
pub struct EditSkillsView {
    /// Skills the user already lists.
    pub skills: Vec<String>,
    /// Known skills the user could pick from.
    pub selection: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewSkillForm {
    #[serde(default)]
    pub new_skill: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    pub query: Option<String>,
    /// `None` until a query is submitted.
    pub results: Option<Vec<UserSummary>>,
}
