use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{FormView, HomeView, SigninForm, SignupForm},
        extractors::{Anonymous, Session, SignedIn},
        password::{credentials_match, hash_password},
    },
    error::AppError,
    repo::{NewUser, RepoError},
    state::AppState,
    validation::{self, ValidationError},
};

pub const INVALID_CREDENTIALS: &str = "Invalid Credentials";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/signin", get(signin_page).post(signin))
        .route("/signout", post(signout))
        .route("/signup", get(signup_page).post(signup))
}

pub async fn landing(session: Session) -> Response {
    let signed_in = session.user_id().is_some();
    session.render(StatusCode::OK, HomeView::for_visitor(signed_in))
}

pub async fn signin_page(Anonymous(session): Anonymous) -> Response {
    session.render(StatusCode::OK, FormView::SIGNIN)
}

#[instrument(skip(state, session, form))]
pub async fn signin(
    State(state): State<AppState>,
    Anonymous(mut session): Anonymous,
    Form(form): Form<SigninForm>,
) -> Result<Response, AppError> {
    let email = validation::normalize_email(&form.user_email);

    let stored = state.repo.password_hash(&email).await?;
    let user_id = if credentials_match(&form.password, stored.as_deref())? {
        state.repo.find_user_id_by_email(&email).await?
    } else {
        None
    };

    let Some(user_id) = user_id else {
        warn!(email = %email, "sign-in rejected");
        session.flash_error(INVALID_CREDENTIALS);
        return Ok(session.render(StatusCode::UNPROCESSABLE_ENTITY, FormView::SIGNIN));
    };

    info!(user_id, email = %email, "user signed in");
    session.sign_in(user_id, email);
    session.flash_success("Welcome!");
    Ok(session.redirect("/"))
}

#[instrument(skip(session))]
pub async fn signout(SignedIn { user_id, mut session }: SignedIn) -> Response {
    info!(user_id, "user signed out");
    session.sign_out();
    session.flash_success("You have been signed out.");
    session.redirect("/")
}

pub async fn signup_page(Anonymous(session): Anonymous) -> Response {
    session.render(StatusCode::OK, FormView::SIGNUP)
}

#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    Anonymous(mut session): Anonymous,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let user = NewUser {
        first_name: validation::normalize_name(&form.first_name),
        second_name: validation::normalize_name(&form.second_name),
        email: validation::normalize_email(&form.user_email),
        phone: validation::normalize_phone(&form.user_phone),
        location: form.user_location.trim().to_string(),
        password_hash: String::new(),
    };

    let email_taken = !user.email.is_empty()
        && state.repo.find_user_id_by_email(&user.email).await?.is_some();
    if let Err(e) = validation::signup(
        &user.first_name,
        &user.second_name,
        &user.email,
        email_taken,
        &user.phone,
        &form.password1,
        &form.password2,
    ) {
        return Ok(reject_signup(session, e));
    }

    let user = NewUser {
        password_hash: hash_password(&form.password1)?,
        ..user
    };
    let user_id = match state.repo.create_user(&user).await {
        Ok(id) => id,
        Err(RepoError::DuplicateEmail(_)) => {
            return Ok(reject_signup(session, ValidationError::EmailTaken))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id, email = %user.email, "user registered");
    session.sign_in(user_id, user.email);
    session.flash_success("Your account has been successfully created.");
    Ok(session.redirect("/"))
}

fn reject_signup(mut session: Session, error: ValidationError) -> Response {
    warn!(%error, "sign-up rejected");
    session.flash_error(error.to_string());
    session.render(StatusCode::UNPROCESSABLE_ENTITY, FormView::SIGNUP)
}
