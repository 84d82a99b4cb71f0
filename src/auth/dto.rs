use serde::{Deserialize, Serialize};

/// Sign-in form body.
#[derive(Debug, Deserialize)]
pub struct SigninForm {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub password: String,
}

/// Sign-up form body.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub second_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_phone: String,
    #[serde(default)]
    pub user_location: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// View for pages that are nothing but an input form.
/// Prior input is never echoed back.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FormView {
    pub form: &'static str,
    pub action: &'static str,
    pub fields: &'static [&'static str],
}

impl FormView {
    pub const SIGNIN: FormView = FormView {
        form: "signin",
        action: "/signin",
        fields: &["user_email", "password"],
    };

    pub const SIGNUP: FormView = FormView {
        form: "signup",
        action: "/signup",
        fields: &[
            "first_name",
            "second_name",
            "user_email",
            "user_phone",
            "user_location",
            "password1",
            "password2",
        ],
    };

    pub const CHANGE_PASSWORD: FormView = FormView {
        form: "change_password",
        action: "/change_password",
        fields: &["password", "password1", "password2"],
    };
}

/// Landing page: where the visitor can go next.
#[derive(Debug, Serialize)]
pub struct HomeView {
    pub links: &'static [&'static str],
}

impl HomeView {
    pub fn for_visitor(signed_in: bool) -> Self {
        let links: &'static [&'static str] = if signed_in {
            &["/my_profile", "/search_skills", "/edit_my_skills", "/signout"]
        } else {
            &["/signin", "/signup"]
        };
        Self { links }
    }
}
