#![allow(dead_code)]

use std::sync::Arc;

use std::io::Cursor;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use blogicum::config::Settings;
use blogicum::models::{Category, NewCategory, NewUser, Post, PostFields, User};
use blogicum::store::{BlogStore, MemoryStore};
use blogicum::{app, AppState};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const AUTHOR: &str = "author-token";
pub const READER: &str = "reader-token";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    pub media: TempDir,
    pub author: User,
    pub reader: User,
    pub category: Category,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(page_size: u64) -> Self {
        let media = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let author = store
            .create_user(NewUser {
                username: "author".into(),
                first_name: "Lev".into(),
                last_name: "Tolstoy".into(),
                email: "lev@example.com".into(),
                api_token: AUTHOR.into(),
            })
            .unwrap();
        let reader = store
            .create_user(NewUser {
                username: "reader".into(),
                api_token: READER.into(),
                ..Default::default()
            })
            .unwrap();
        let category = store
            .create_category(NewCategory {
                title: "Travel".into(),
                description: "Where we went".into(),
                slug: "travel".into(),
                is_published: true,
            })
            .unwrap();

        let settings = Settings {
            db_url: "memory://".into(),
            bind_addr: "127.0.0.1:0".into(),
            media_root: media.path().to_path_buf(),
            page_size,
            login_url: "/auth/login/".into(),
            cors_origin: None,
        };
        let shared: Arc<dyn BlogStore> = store.clone();
        let router = app(AppState::new(shared, settings));

        TestApp {
            store,
            router,
            media,
            author,
            reader,
            category,
        }
    }

    pub fn fields(&self, title: &str, age: Duration) -> PostFields {
        PostFields {
            title: title.into(),
            text: format!("{} text", title),
            pub_date: Utc::now() - age,
            image: None,
            is_published: true,
            location_id: None,
            category_id: Some(self.category.id),
        }
    }

    /// A post by the author published `age` ago (negative for the future).
    pub fn post(&self, title: &str, age: Duration) -> Post {
        self.store
            .create_post(self.author.id, self.fields(title, age))
            .unwrap()
    }

    pub fn post_with(&self, fields: PostFields) -> Post {
        self.store.create_post(self.author.id, fields).unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut request = Request::get(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.post_raw(uri, token, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, token: Option<&str>, body: String) -> Response<Body> {
        let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub fn ids(page: &Value) -> Vec<i64> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

/// A small PNG as the base64 an image upload carries.
pub fn png_base64() -> String {
    let mut png = Cursor::new(Vec::new());
    image::RgbImage::new(3, 3)
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();
    STANDARD.encode(png.into_inner())
}

/// Whether a `/media/...` URL has a file behind it.
pub fn on_disk(app: &TestApp, url: &str) -> bool {
    app.media.path().join(url.trim_start_matches("/media/")).exists()
}

/// A 400 answered with the JSON failure document.
pub async fn assert_malformed(response: Response<Body>) {
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["status"], "fail");
}
