use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{RequestHelpForm, RequestHelpView};
use crate::{
    auth::{
        guards::{self, Denied},
        SignedIn,
    },
    error::AppError,
    state::AppState,
    validation,
};

pub const SKILL_NOT_OFFERED: &str = "This user does not offer that skill.";

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:other_id/request_help",
            get(request_help_page).post(open_request),
        )
        .route("/out_requests/:request_id/close", post(close_request))
}

#[instrument(skip(state, session))]
pub async fn request_help_page(
    State(state): State<AppState>,
    SignedIn { session, .. }: SignedIn,
    Path(other_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(helper_id) = guards::existing_user(state.repo.as_ref(), &other_id).await? else {
        return Ok(session.deny(Denied::NotFound));
    };
    let Some(helper) = state.repo.user_profile(helper_id).await? else {
        return Ok(session.deny(Denied::NotFound));
    };
    Ok(session.render(StatusCode::OK, RequestHelpView::new(helper)))
}

#[instrument(skip(state, session, form))]
pub async fn open_request(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Path(other_id): Path<String>,
    Form(form): Form<RequestHelpForm>,
) -> Result<Response, AppError> {
    let Some(helper_id) = guards::existing_user(state.repo.as_ref(), &other_id).await? else {
        return Ok(session.deny(Denied::NotFound));
    };

    let skill = validation::normalize_skill(&form.skill);
    if !state.repo.user_has_skill(helper_id, &skill).await? {
        warn!(user_id, helper_id, skill = %skill, "requested skill not offered");
        let Some(helper) = state.repo.user_profile(helper_id).await? else {
            return Ok(session.deny(Denied::NotFound));
        };
        session.flash_error(SKILL_NOT_OFFERED);
        return Ok(session.render(
            StatusCode::UNPROCESSABLE_ENTITY,
            RequestHelpView::new(helper),
        ));
    }

    let request_id = state
        .repo
        .create_request(user_id, helper_id, &skill, form.comment.trim())
        .await?;

    info!(user_id, helper_id, request_id, skill = %skill, "request opened");
    session.flash_success("Your request was successfully opened.");
    Ok(session.redirect("/my_profile"))
}

#[instrument(skip(state, session))]
pub async fn close_request(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Path(request_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(request_id) =
        guards::owned_request(state.repo.as_ref(), user_id, &request_id).await?
    else {
        return Ok(session.deny(Denied::NotFound));
    };

    state.repo.close_request(request_id).await?;

    info!(user_id, request_id, "request closed");
    session.flash_success("Your request was successfully closed.");
    Ok(session.redirect("/my_profile"))
}
