use serde::{Deserialize, Serialize};

use crate::repo::{RequestLists, UserProfile};

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub profile: UserProfile,
    pub requests: RequestLists,
}

#[derive(Debug, Serialize)]
pub struct ClosedRequestsView {
    pub requests: RequestLists,
}

#[derive(Debug, Serialize)]
pub struct EditProfileView {
    pub profile: UserProfile,
    pub action: &'static str,
}

/// Absent fields are left as they are.
#[derive(Debug, Deserialize)]
pub struct ChangeProfileForm {
    pub first_name: Option<String>,
    pub second_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}
