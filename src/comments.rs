use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::{Access, CurrentUser};
use crate::error::{Error, Result};
use crate::forms::CommentForm;
use crate::models::{Comment, User};
use crate::urls::{SuccessUrl, Url};
use crate::visibility::PublicVisibility;
use crate::AppState;

const ON_SUCCESS: SuccessUrl = SuccessUrl::ParentPost;

/// Author and post come from the identity and the URL, never from the body.
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    body: Bytes,
) -> Result<Response> {
    let card = state.store.post_card(post_id)?.ok_or(Error::NotFound)?;
    if card.post.author_id != user.id && !PublicVisibility::at(Utc::now()).admits_card(&card) {
        return Err(Error::NotFound);
    }
    let form: CommentForm = serde_json::from_slice(&body)?;
    let text = form.clean()?;
    let comment = state.store.create_comment(post_id, user.id, text)?;
    tracing::info!("add_comment: {} commented on post {}", user.username, post_id);
    Ok(ON_SUCCESS.resolve(&user, comment.post_id).redirect().into_response())
}

/// Loads a comment of the post in the URL and checks that `user` wrote it.
fn authorize(
    state: &AppState,
    user: &User,
    post_id: i64,
    comment_id: i64,
) -> Result<(Comment, Access)> {
    let comment = state
        .store
        .comment(comment_id)?
        .filter(|comment| comment.post_id == post_id)
        .ok_or(Error::NotFound)?;
    let access = Access::author_only(user, comment.author_id, Url::PostDetail(comment.post_id));
    Ok((comment, access))
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response> {
    let (comment, access) = authorize(&state, &user, post_id, comment_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    Ok(Json(CommentForm { text: comment.text }).into_response())
}

/// The body is parsed only after the ownership check.
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    body: Bytes,
) -> Result<Response> {
    let (comment, access) = authorize(&state, &user, post_id, comment_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    let form: CommentForm = serde_json::from_slice(&body)?;
    let comment = state.store.update_comment(comment.id, form.clean()?)?;
    tracing::info!("update_comment: {} edited comment {}", user.username, comment.id);
    Ok(ON_SUCCESS.resolve(&user, comment.post_id).redirect().into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response> {
    let (comment, access) = authorize(&state, &user, post_id, comment_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    Ok(Json(comment).into_response())
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response> {
    let (comment, access) = authorize(&state, &user, post_id, comment_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    state.store.delete_comment(comment.id)?;
    tracing::info!("delete_comment: {} deleted comment {}", user.username, comment.id);
    Ok(ON_SUCCESS.resolve(&user, comment.post_id).redirect().into_response())
}
