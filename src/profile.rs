use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::auth::{CurrentUser, Viewer};
use crate::error::{Error, Result};
use crate::forms::ProfileForm;
use crate::models::{PostCard, Profile};
use crate::pagination::{Page, PageQuery};
use crate::urls::Url;
use crate::visibility::PostQuery;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub profile: Profile,
    pub page: Page<PostCard>,
}

/// The owner sees every post they wrote; visitors only the public ones.
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfilePage>> {
    let user = state
        .store
        .user_by_username(&username)?
        .ok_or(Error::NotFound)?;
    let mut posts = PostQuery::by_author(user.id);
    if !viewer.is(user.id) {
        posts = posts.visible_at(Utc::now());
    }
    let request = query.request(state.settings.page_size)?;
    let page = state.store.list_posts(&posts, request)?;
    Ok(Json(ProfilePage {
        profile: Profile::from(&user),
        page,
    }))
}

pub async fn edit_form(CurrentUser(user): CurrentUser) -> Json<ProfileForm> {
    Json(ProfileForm::from(&user))
}

/// Always edits the signed-in user; there is no id to tamper with.
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Response> {
    let form: ProfileForm = serde_json::from_slice(&body)?;
    let changed = form.apply(&user)?;
    let saved = state.store.update_user(&changed)?;
    tracing::info!("edit_profile: {} is now {}", user.username, saved.username);
    Ok(Url::Profile(saved.username).redirect().into_response())
}
