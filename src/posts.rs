use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::auth::{Access, CurrentUser, Viewer};
use crate::error::{Error, Result};
use crate::forms::{CommentForm, PostForm};
use crate::media::discard_unused;
use crate::models::{Category, CommentCard, Location, Post, PostCard, User};
use crate::pagination::{Page, PageQuery};
use crate::urls::{SuccessUrl, Url};
use crate::visibility::{PostQuery, PublicVisibility};
use crate::AppState;

const ON_SUCCESS: SuccessUrl = SuccessUrl::AuthorProfile;

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: PostCard,
    pub comments: Vec<CommentCard>,
    pub form: CommentForm,
}

/// The post form together with the choices it offers.
#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub form: PostForm,
    pub image: Option<String>,
    pub categories: Vec<Category>,
    pub locations: Vec<Location>,
}

impl PostFormPage {
    fn new(state: &AppState, form: PostForm, image: Option<String>) -> Result<Self> {
        Ok(PostFormPage {
            form,
            image,
            categories: state.store.categories()?,
            locations: state.store.locations()?,
        })
    }
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<PostCard>>> {
    let request = query.request(state.settings.page_size)?;
    let page = state
        .store
        .list_posts(&PostQuery::public(Utc::now()), request)?;
    Ok(Json(page))
}

pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<i64>,
) -> Result<Json<PostDetail>> {
    tracing::debug!("post_detail {}", post_id);
    let card = state.store.post_card(post_id)?.ok_or(Error::NotFound)?;
    if !viewer.is(card.post.author_id) && !PublicVisibility::at(Utc::now()).admits_card(&card) {
        return Err(Error::NotFound);
    }
    let comments = state.store.comments_for(post_id)?;
    Ok(Json(PostDetail {
        post: card,
        comments,
        form: CommentForm::default(),
    }))
}

pub async fn create_form(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<PostFormPage>> {
    Ok(Json(PostFormPage::new(&state, PostForm::default(), None)?))
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Response> {
    let form: PostForm = serde_json::from_slice(&body)?;
    let media_root = &state.settings.media_root;
    let fields = form.clean(state.store.as_ref(), media_root, None)?;
    let uploaded = fields.image.clone();
    let post = state.store.create_post(user.id, fields).inspect_err(|_| {
        discard_unused(media_root, uploaded.as_deref(), None);
    })?;
    tracing::info!("create_post: {} created post {} ({})", user.username, post.id, post);
    Ok(ON_SUCCESS.resolve(&user, post.id).redirect().into_response())
}

/// Loads the post and checks that `user` wrote it.
fn authorize(state: &AppState, user: &User, post_id: i64) -> Result<(Post, Access)> {
    let post = state.store.post(post_id)?.ok_or(Error::NotFound)?;
    let access = Access::author_only(user, post.author_id, Url::PostDetail(post.id));
    Ok((post, access))
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Response> {
    let (post, access) = authorize(&state, &user, post_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    let page = PostFormPage::new(&state, PostForm::from(&post), post.image.clone())?;
    Ok(Json(page).into_response())
}

/// The body is parsed only after the ownership check.
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    body: Bytes,
) -> Result<Response> {
    let (post, access) = authorize(&state, &user, post_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    let form: PostForm = serde_json::from_slice(&body)?;
    let media_root = &state.settings.media_root;
    let previous = post.image.clone();
    let fields = form.clean(state.store.as_ref(), media_root, post.image)?;
    let uploaded = fields.image.clone();
    let post = state.store.update_post(post.id, fields).inspect_err(|_| {
        discard_unused(media_root, uploaded.as_deref(), previous.as_deref());
    })?;
    discard_unused(media_root, previous.as_deref(), post.image.as_deref());
    tracing::info!("update_post: {} updated post {} ({})", user.username, post.id, post);
    Ok(ON_SUCCESS.resolve(&user, post.id).redirect().into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Response> {
    let (post, access) = authorize(&state, &user, post_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    let card = state.store.post_card(post.id)?.ok_or(Error::NotFound)?;
    Ok(Json(card).into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Response> {
    let (post, access) = authorize(&state, &user, post_id)?;
    if let Access::Denied(url) = access {
        return Ok(url.redirect().into_response());
    }
    state.store.delete_post(post.id)?;
    discard_unused(&state.settings.media_root, post.image.as_deref(), None);
    tracing::info!("delete_post: {} deleted post {}", user.username, post.id);
    Ok(ON_SUCCESS.resolve(&user, post.id).redirect().into_response())
}
