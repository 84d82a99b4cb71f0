use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{EditSkillsView, NewSkillForm, SearchParams, SearchView};
use crate::{
    auth::{
        guards::{self, Denied},
        SignedIn,
    },
    error::AppError,
    repo::{Repository, UserId},
    state::AppState,
    validation,
};

pub fn skill_routes() -> Router<AppState> {
    Router::new()
        .route("/edit_my_skills", get(edit_skills_page).post(add_skill))
        .route("/skills/:skill/remove", post(remove_skill))
        .route("/search_skills", get(search_skills))
}

/// The user's skills plus every known skill they do not list yet.
/// `None` when the user no longer exists.
async fn skills_view(repo: &dyn Repository, user_id: UserId) -> Result<Option<EditSkillsView>, AppError> {
    let Some(profile) = repo.user_profile(user_id).await? else {
        return Ok(None);
    };
    let selection = repo
        .all_skill_names()
        .await?
        .into_iter()
        .filter(|s| !profile.skills.contains(s))
        .collect();
    Ok(Some(EditSkillsView {
        skills: profile.skills,
        selection,
    }))
}

#[instrument(skip(state, session))]
pub async fn edit_skills_page(
    State(state): State<AppState>,
    SignedIn { user_id, session }: SignedIn,
) -> Result<Response, AppError> {
    match skills_view(state.repo.as_ref(), user_id).await? {
        Some(view) => Ok(session.render(StatusCode::OK, view)),
        None => Ok(session.expire()),
    }
}

#[instrument(skip(state, session, form))]
pub async fn add_skill(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Form(form): Form<NewSkillForm>,
) -> Result<Response, AppError> {
    let Some(view) = skills_view(state.repo.as_ref(), user_id).await? else {
        return Ok(session.expire());
    };

    let skill = validation::normalize_skill(&form.new_skill);
    if let Err(e) = validation::new_skill(&skill, &view.skills) {
        warn!(user_id, skill = %skill, error = %e, "skill rejected");
        session.flash_error(e.to_string());
        return Ok(session.render(StatusCode::UNPROCESSABLE_ENTITY, view));
    }

    state.repo.attach_skill(&skill, user_id).await?;

    info!(user_id, skill = %skill, "skill added");
    session.flash_success("New skill was successfully added!");
    Ok(session.redirect("/edit_my_skills"))
}

#[instrument(skip(state, session))]
pub async fn remove_skill(
    State(state): State<AppState>,
    SignedIn { user_id, mut session }: SignedIn,
    Path(skill): Path<String>,
) -> Result<Response, AppError> {
    let skill = validation::normalize_skill(&skill);
    if !guards::owned_skill(state.repo.as_ref(), user_id, &skill).await? {
        return Ok(session.deny(Denied::NotFound));
    }

    state.repo.remove_skill_from_user(&skill, user_id).await?;

    info!(user_id, skill = %skill, "skill removed");
    session.flash_success("The skill was successfully removed!");
    Ok(session.redirect("/edit_my_skills"))
}

#[instrument(skip(state, session))]
pub async fn search_skills(
    State(state): State<AppState>,
    SignedIn { user_id, session }: SignedIn,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let query = params.query.map(|q| q.trim().to_string());
    let results = match &query {
        Some(pattern) => {
            let mut hits = state.repo.search_users_by_skill(pattern).await?;
            hits.retain(|u| u.id != user_id);
            Some(hits)
        }
        None => None,
    };
    Ok(session.render(StatusCode::OK, SearchView { query, results }))
}
