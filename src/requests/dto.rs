use serde::{Deserialize, Serialize};

use crate::repo::UserProfile;

/// The user being asked for help and the skills they offer.
#[derive(Debug, Serialize)]
pub struct RequestHelpView {
    pub helper: UserProfile,
    pub action: String,
}

impl RequestHelpView {
    pub fn new(helper: UserProfile) -> Self {
        let action = format!("/{}/request_help", helper.id);
        Self { helper, action }
    }
}

#[derive(Debug, Deserialize)]
pub struct RequestHelpForm {
    #[serde(default)]
    pub skill: String,
    #[serde(default)]
    pub comment: String,
}
