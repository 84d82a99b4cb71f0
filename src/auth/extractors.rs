use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tracing::{error, warn};

use super::{
    claims::Flash,
    guards::{self, Denied},
    jwt::{SessionData, SessionKeys},
};
use crate::{error::AppError, repo::UserId, state::AppState};

pub const SESSION_COOKIE: &str = "mahno_session";

/// Request-scoped session: who is signed in plus pending flash messages.
///
/// Handlers mutate it and finish with [`Session::redirect`] or [`Session::render`],
/// both of which write the updated session back as a signed cookie.
pub struct Session {
    data: SessionData,
    keys: SessionKeys,
    jar: CookieJar,
}

/// Body of every rendered page.
#[derive(Debug, Serialize)]
pub struct Page<V> {
    pub signed_in_as: Option<String>,
    pub flash: Flash,
    pub view: V,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state).await?;
        let data = match jar.get(SESSION_COOKIE) {
            Some(cookie) => keys.verify(cookie.value()).unwrap_or_else(|e| {
                warn!(error = %e, "discarding invalid session cookie");
                SessionData::default()
            }),
            None => SessionData::default(),
        };
        Ok(Self { data, keys, jar })
    }
}

impl Session {
    pub fn user_id(&self) -> Option<UserId> {
        self.data.login
    }

    pub fn sign_in(&mut self, user_id: UserId, email: String) {
        self.data.login = Some(user_id);
        self.data.email = Some(email);
    }

    pub fn sign_out(&mut self) {
        self.data.login = None;
        self.data.email = None;
    }

    pub fn flash_error(&mut self, message: impl Into<String>) {
        self.data.flash.error = Some(message.into());
    }

    pub fn flash_success(&mut self, message: impl Into<String>) {
        self.data.flash.success = Some(message.into());
    }

    /// `303 See Other` to `to`, carrying the session forward.
    pub fn redirect(self, to: &str) -> Response {
        (self.into_jar(), Redirect::to(to)).into_response()
    }

    /// Renders `view`, consuming the flash so it is shown exactly once.
    pub fn render<V: Serialize>(mut self, status: StatusCode, view: V) -> Response {
        let flash = std::mem::take(&mut self.data.flash);
        let page = Page {
            signed_in_as: self.data.email.clone(),
            flash,
            view,
        };
        (status, self.into_jar(), Json(page)).into_response()
    }

    /// Redirects home, explaining the denial when there is something to say.
    pub fn deny(mut self, denied: Denied) -> Response {
        if denied != Denied::SignedIn {
            self.flash_error(denied.to_string());
        }
        self.redirect("/")
    }

    /// The signed-in account no longer exists: forget it and ask for a fresh sign-in.
    pub fn expire(mut self) -> Response {
        warn!(login = ?self.data.login, "session refers to a missing user");
        self.sign_out();
        self.deny(Denied::SignInRequired)
    }

    fn into_jar(self) -> CookieJar {
        match self.keys.sign(&self.data) {
            Ok(token) => self.jar.add(
                Cookie::build((SESSION_COOKIE, token))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.keys.secure_cookie),
            ),
            Err(e) => {
                error!(error = %e, "failed to sign session; clearing it");
                self.jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
            }
        }
    }
}

/// A signed-in session whose user still exists. Anonymous visitors are sent
/// home with a sign-in notice; sessions of deleted users are expired.
pub struct SignedIn {
    pub user_id: UserId,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let user_id = match guards::require_login(&session) {
            Ok(user_id) => user_id,
            Err(denied) => {
                warn!(path = %parts.uri.path(), "anonymous access denied");
                return Err(session.deny(denied));
            }
        };
        let app = AppState::from_ref(state);
        match app.repo.user_exists(user_id).await {
            Ok(true) => Ok(SignedIn { user_id, session }),
            Ok(false) => Err(session.expire()),
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}

/// An anonymous session. Signed-in users are sent home.
pub struct Anonymous(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for Anonymous
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        match guards::require_anonymous(&session) {
            Ok(()) => Ok(Anonymous(session)),
            Err(denied) => Err(session.deny(denied)),
        }
    }
}
