use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod auth;
pub mod categories;
pub mod comments;
pub mod config;
pub mod database;
pub mod error;
pub mod forms;
pub mod health;
pub mod media;
pub mod models;
pub mod pagination;
pub mod posts;
pub mod profile;
pub mod store;
pub mod urls;
pub mod visibility;

use crate::config::Settings;
use crate::store::BlogStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn BlogStore>, settings: Settings) -> Self {
        AppState {
            store,
            settings: Arc::new(settings),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let media = ServeDir::new(&state.settings.media_root);
    let cors = state
        .settings
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
        .map(|origin| CorsLayer::new().allow_origin(origin));

    let router = Router::new()
        .route(urls::INDEX, get(posts::index))
        .route(urls::POST_CREATE, get(posts::create_form).post(posts::create_post))
        .route(urls::POST_DETAIL, get(posts::post_detail))
        .route(urls::POST_EDIT, get(posts::edit_form).post(posts::update_post))
        .route(urls::POST_DELETE, get(posts::delete_confirm).post(posts::delete_post))
        .route(urls::COMMENT_ADD, post(comments::add_comment))
        .route(
            urls::COMMENT_EDIT,
            get(comments::edit_form).post(comments::update_comment),
        )
        .route(
            urls::COMMENT_DELETE,
            get(comments::delete_confirm).post(comments::delete_comment),
        )
        .route(urls::CATEGORY, get(categories::category_posts))
        .route(urls::PROFILE, get(profile::profile))
        .route(
            urls::PROFILE_EDIT,
            get(profile::edit_form).post(profile::edit_profile),
        )
        .route(urls::HEALTHCHECK, get(health::health_check_handler))
        .nest_service(urls::MEDIA, media)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_identity,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
