use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::get,
    Form, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    ChangePasswordForm, ChangeProfileForm, ClosedRequestsView, EditProfileView, ProfileView,
};
use crate::{
    auth::{
        dto::FormView,
        password::{credentials_match, hash_password},
        SignedIn,
    },
    error::AppError,
    state::AppState,
    validation,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/my_profile", get(my_profile))
        .route("/closed_requests", get(closed_requests))
        .route("/change_profile", get(change_profile_page).post(change_profile))
        .route("/change_password", get(change_password_page).post(change_password))
}

#[instrument(skip(state, session))]
pub async fn my_profile(
    State(state): State<AppState>,
    SignedIn { user_id, session }: SignedIn,
) -> Result<Response, AppError> {
    let Some(profile) = state.repo.user_profile(user_id).await? else {
        return Ok(session.expire());
    };
    let requests = state.repo.list_requests(user_id, false).await?;
    Ok(session.render(StatusCode::OK, ProfileView { profile, requests }))
}

#[instrument(skip(state, session))]
pub async fn closed_requests(
    State(state): State<AppState>,
    SignedIn { user_id, session }: SignedIn,
) -> Result<Response, AppError> {
    let requests = state.repo.list_requests(user_id, true).await?;
    Ok(session.render(StatusCode::OK, ClosedRequestsView { requests }))
}

#[instrument(skip(state, session))]
pub async fn change_profile_page(
    State(state): State<AppState>,
    SignedIn { user_id, session }: SignedIn,
) -> Result<Response, AppError> {
    let Some(profile) = state.repo.user_profile(user_id).await? else {
        return Ok(session.expire());
    };
    Ok(session.render(
        StatusCode::OK,
        EditProfileView {
            profile,
            action: "/change_profile",
        },
    ))
}

#[instrument(skip(state, session, form))]
pub async fn change_profile(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Form(form): Form<ChangeProfileForm>,
) -> Result<Response, AppError> {
    let Some(current) = state.repo.user_profile(user_id).await? else {
        return Ok(session.expire());
    };

    let first = form.first_name.as_deref().map(validation::normalize_name);
    let second = form.second_name.as_deref().map(validation::normalize_name);
    let phone = form.phone.as_deref().map(validation::normalize_phone);
    let location = form.location.as_deref().map(|l| l.trim().to_string());

    if let Err(e) =
        validation::profile_changes(first.as_deref(), second.as_deref(), phone.as_deref())
    {
        warn!(user_id, error = %e, "profile change rejected");
        session.flash_error(e.to_string());
        return Ok(session.render(
            StatusCode::UNPROCESSABLE_ENTITY,
            EditProfileView {
                profile: current,
                action: "/change_profile",
            },
        ));
    }

    // Empty names mean "keep"; only fields that actually change are written.
    if let Some(name) = first.filter(|n| !n.is_empty() && *n != current.first_name) {
        state.repo.update_first_name(user_id, &name).await?;
    }
    if let Some(name) = second.filter(|n| !n.is_empty() && *n != current.second_name) {
        state.repo.update_second_name(user_id, &name).await?;
    }
    if let Some(phone) = phone.filter(|p| *p != current.phone) {
        state.repo.update_phone(user_id, &phone).await?;
    }
    if let Some(location) = location.filter(|l| *l != current.location) {
        state.repo.update_location(user_id, &location).await?;
    }

    info!(user_id, "profile updated");
    session.flash_success("Your personal information was successfully changed!");
    Ok(session.redirect("/my_profile"))
}

pub async fn change_password_page(SignedIn { session, .. }: SignedIn) -> Response {
    session.render(StatusCode::OK, FormView::CHANGE_PASSWORD)
}

#[instrument(skip(state, session, form))]
pub async fn change_password(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AppError> {
    let Some(profile) = state.repo.user_profile(user_id).await? else {
        return Ok(session.expire());
    };

    let stored = state.repo.password_hash(&profile.email).await?;
    if !credentials_match(&form.password, stored.as_deref())? {
        warn!(user_id, "password change with wrong current password");
        session.flash_error("Please, enter valid current password.");
        return Ok(session.render(StatusCode::UNPROCESSABLE_ENTITY, FormView::CHANGE_PASSWORD));
    }

    if let Err(e) = validation::new_password(&form.password1, &form.password2) {
        warn!(user_id, error = %e, "new password rejected");
        session.flash_error(e.to_string());
        return Ok(session.render(StatusCode::UNPROCESSABLE_ENTITY, FormView::CHANGE_PASSWORD));
    }

    let hash = hash_password(&form.password1)?;
    state.repo.update_password_hash(user_id, &hash).await?;

    info!(user_id, "password changed");
    session.flash_success("You've successfully changed your password!");
    Ok(session.redirect("/change_profile"))
}
