mod common;

use axum::http::StatusCode;
use blogicum::models::{NewCategory, PostFields};
use blogicum::pagination::PageRequest;
use blogicum::store::BlogStore;
use blogicum::visibility::PostQuery;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{
    assert_malformed, ids, json, location, on_disk, png_base64, TestApp, AUTHOR, READER,
};

#[tokio::test]
async fn index_lists_only_public_posts_newest_first() {
    let app = TestApp::new();
    let older = app.post("older", Duration::days(2));
    let newer = app.post("newer", Duration::days(1));
    app.post("scheduled", -Duration::hours(1));
    app.post_with(PostFields {
        is_published: false,
        ..app.fields("hidden", Duration::days(1))
    });
    app.post_with(PostFields {
        category_id: None,
        ..app.fields("uncategorized", Duration::days(1))
    });
    let closed = app
        .store
        .create_category(NewCategory {
            title: "Drafts".into(),
            description: String::new(),
            slug: "drafts".into(),
            is_published: false,
        })
        .unwrap();
    app.post_with(PostFields {
        category_id: Some(closed.id),
        ..app.fields("in closed category", Duration::days(1))
    });
    app.store
        .create_comment(older.id, app.reader.id, "first!".into())
        .unwrap();

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(ids(&page), vec![newer.id, older.id]);
    assert_eq!(page["count"], 2);
    assert_eq!(page["items"][1]["comment_count"], 1);
    assert_eq!(page["items"][0]["author"], "author");
    assert_eq!(page["items"][0]["category"]["slug"], "travel");
}

#[tokio::test]
async fn index_is_paginated() {
    let app = TestApp::with_page_size(10);
    for n in 0..12 {
        app.post(&format!("post {}", n), Duration::hours(n + 1));
    }

    let first = json(app.get("/", None).await).await;
    assert_eq!(first["items"].as_array().unwrap().len(), 10);
    assert_eq!(first["num_pages"], 2);
    assert_eq!(first["has_next"], true);

    let second = json(app.get("/?page=2", None).await).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 2);
    assert_eq!(second["has_previous"], true);

    assert_eq!(app.get("/?page=3", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/?page=abc", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scheduled_post_is_visible_to_its_author_only() {
    let app = TestApp::new();
    let post = app.post("tomorrow", -Duration::hours(1));
    let uri = format!("/posts/{}/", post.id);

    let page = json(app.get("/", None).await).await;
    assert!(ids(&page).is_empty());

    assert_eq!(app.get(&uri, None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, Some(READER)).await.status(), StatusCode::NOT_FOUND);

    let response = app.get(&uri, Some(AUTHOR)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["post"]["id"], post.id);
}

#[tokio::test]
async fn detail_has_comments_and_an_empty_form() {
    let app = TestApp::new();
    let post = app.post("with comments", Duration::hours(1));
    app.store
        .create_comment(post.id, app.reader.id, "one".into())
        .unwrap();
    app.store
        .create_comment(post.id, app.author.id, "two".into())
        .unwrap();

    let detail = json(app.get(&format!("/posts/{}/", post.id), None).await).await;
    assert_eq!(detail["post"]["comment_count"], 2);
    assert_eq!(detail["comments"][0]["text"], "one");
    assert_eq!(detail["comments"][0]["author"], "reader");
    assert_eq!(detail["comments"][1]["text"], "two");
    assert_eq!(detail["form"]["text"], "");
}

#[tokio::test]
async fn unknown_post_is_not_found() {
    let app = TestApp::new();
    assert_eq!(app.get("/posts/999/", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let app = TestApp::new();
    let response = app.get("/", Some("stolen")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_requires_login() {
    let app = TestApp::new();
    let response = app.get("/posts/create/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=/posts/create/");

    let response = app
        .post_json("/posts/create/", None, json!({ "title": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let all = app
        .store
        .list_posts(&PostQuery::default(), PageRequest::first(10))
        .unwrap();
    assert_eq!(all.count, 0);
}

#[tokio::test]
async fn create_form_offers_choices() {
    let app = TestApp::new();
    let form = json(app.get("/posts/create/", Some(READER)).await).await;
    assert_eq!(form["categories"][0]["slug"], "travel");
    assert_eq!(form["form"]["is_published"], true);
}

#[tokio::test]
async fn create_post_sets_author_and_redirects_to_profile() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/posts/create/",
            Some(READER),
            json!({
                "title": "Baikal",
                "text": "Ice everywhere",
                "pub_date": Utc::now().to_rfc3339(),
                "category": app.category.id,
                "author_id": app.author.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/reader/");

    let page = json(app.get("/", None).await).await;
    assert_eq!(page["items"][0]["title"], "Baikal");
    assert_eq!(page["items"][0]["author_id"], app.reader.id);
}

#[tokio::test]
async fn create_post_reports_field_errors() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/posts/create/",
            Some(AUTHOR),
            json!({ "title": "", "text": "body", "category": 404 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json(response).await;
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["pub_date"].is_array());
    assert_eq!(body["errors"]["category"][0]["code"], "does_not_exist");
}

#[tokio::test]
async fn create_post_stores_uploaded_image() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/posts/create/",
            Some(AUTHOR),
            json!({
                "title": "Photo",
                "text": "See attached",
                "pub_date": Utc::now().to_rfc3339(),
                "category": app.category.id,
                "image": { "filename": "lake.png", "base64": png_base64() },
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let page = json(app.get("/", None).await).await;
    let url = page["items"][0]["image"].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/posts_images/"));
    assert!(on_disk(&app, &url));

    let served = app.get(&url, None).await;
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_author_cannot_edit_and_body_is_never_read() {
    let app = TestApp::new();
    let post = app.post("original", Duration::hours(1));
    let uri = format!("/posts/{}/edit/", post.id);

    let response = app.get(&uri, Some(READER)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let response = app.post_raw(&uri, Some(READER), "{ not json".into()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));
    assert_eq!(app.store.post(post.id).unwrap().unwrap().title, "original");
}

#[tokio::test]
async fn author_edits_post() {
    let app = TestApp::new();
    let post = app.post("original", Duration::hours(1));
    let uri = format!("/posts/{}/edit/", post.id);

    let form = json(app.get(&uri, Some(AUTHOR)).await).await;
    assert_eq!(form["form"]["title"], "original");
    assert_eq!(form["form"]["category"], app.category.id);

    let response = app
        .post_json(
            &uri,
            Some(AUTHOR),
            json!({
                "title": "edited",
                "text": "new text",
                "pub_date": post.pub_date.to_rfc3339(),
                "category": app.category.id,
                "is_published": false,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/author/");

    let stored = app.store.post(post.id).unwrap().unwrap();
    assert_eq!(stored.title, "edited");
    assert!(!stored.is_published);

    assert_malformed(app.post_raw(&uri, Some(AUTHOR), "{ not json".into()).await).await;
}

#[tokio::test]
async fn malformed_create_body_is_a_json_error() {
    let app = TestApp::new();
    assert_malformed(
        app.post_raw("/posts/create/", Some(AUTHOR), "{ not json".into())
            .await,
    )
    .await;
    assert_eq!(
        app.store
            .list_posts(&PostQuery::default(), PageRequest::first(10))
            .unwrap()
            .count,
        0
    );
}

#[tokio::test]
async fn replaced_and_deleted_images_leave_the_media_root() {
    let app = TestApp::new();
    let form = |image: bool| {
        let mut body = json!({
            "title": "Photo",
            "text": "See attached",
            "pub_date": Utc::now().to_rfc3339(),
            "category": app.category.id,
        });
        if image {
            body["image"] = json!({ "filename": "lake.png", "base64": png_base64() });
        }
        body
    };
    let image_of = |id: i64| app.store.post(id).unwrap().unwrap().image.unwrap();

    app.post_json("/posts/create/", Some(AUTHOR), form(true)).await;
    let post = app
        .store
        .list_posts(&PostQuery::default(), PageRequest::first(10))
        .unwrap()
        .items
        .remove(0);
    let first = image_of(post.post.id);
    let uri = format!("/posts/{}/edit/", post.post.id);

    let response = app.post_json(&uri, Some(AUTHOR), form(false)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(image_of(post.post.id), first);
    assert!(on_disk(&app, &first));

    app.post_json(&uri, Some(AUTHOR), form(true)).await;
    let second = image_of(post.post.id);
    assert_ne!(second, first);
    assert!(!on_disk(&app, &first));
    assert!(on_disk(&app, &second));

    let response = app
        .post_json(
            &format!("/posts/{}/delete/", post.post.id),
            Some(AUTHOR),
            json!({}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!on_disk(&app, &second));
}

#[tokio::test]
async fn only_the_author_deletes() {
    let app = TestApp::new();
    let post = app.post("doomed", Duration::hours(1));
    app.store
        .create_comment(post.id, app.reader.id, "bye".into())
        .unwrap();
    let uri = format!("/posts/{}/delete/", post.id);

    let response = app.post_json(&uri, Some(READER), json!({})).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));
    assert!(app.store.post(post.id).unwrap().is_some());

    let confirm = json(app.get(&uri, Some(AUTHOR)).await).await;
    assert_eq!(confirm["title"], "doomed");

    let response = app.post_json(&uri, Some(AUTHOR), json!({})).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/author/");
    assert!(app.store.post(post.id).unwrap().is_none());
    assert!(app.store.comments_for(post.id).unwrap().is_empty());

    assert_eq!(
        app.post_json(&uri, Some(AUTHOR), json!({})).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn deleting_the_author_removes_their_posts() {
    let app = TestApp::new();
    let post = app.post("gone soon", Duration::hours(1));
    app.store.delete_user(app.author.id).unwrap();

    assert_eq!(
        app.get(&format!("/posts/{}/", post.id), None).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(ids(&json(app.get("/", None).await).await).is_empty());
}
