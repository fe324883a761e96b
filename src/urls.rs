use axum::response::Redirect;

use crate::models::User;

pub const INDEX: &str = "/";
pub const POST_DETAIL: &str = "/posts/:post_id/";
pub const POST_CREATE: &str = "/posts/create/";
pub const POST_EDIT: &str = "/posts/:post_id/edit/";
pub const POST_DELETE: &str = "/posts/:post_id/delete/";
pub const COMMENT_ADD: &str = "/posts/:post_id/comment/";
pub const COMMENT_EDIT: &str = "/posts/:post_id/edit_comment/:comment_id/";
pub const COMMENT_DELETE: &str = "/posts/:post_id/delete_comment/:comment_id/";
pub const CATEGORY: &str = "/category/:category_slug/";
pub const PROFILE: &str = "/profile/:username/";
pub const PROFILE_EDIT: &str = "/edit_profile/";
pub const HEALTHCHECK: &str = "/api/healthcheck";
pub const MEDIA: &str = "/media";

/// A resolved location inside the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Url {
    PostDetail(i64),
    Profile(String),
    Login { login_url: String, next: String },
}

impl Url {
    pub fn path(&self) -> String {
        match self {
            Url::PostDetail(post_id) => format!("/posts/{}/", post_id),
            Url::Profile(username) => format!("/profile/{}/", username),
            Url::Login { login_url, next } => format!("{}?next={}", login_url, next),
        }
    }

    pub fn redirect(&self) -> Redirect {
        Redirect::to(&self.path())
    }
}

/// Where a mutation sends the user once it has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessUrl {
    /// The acting user's profile.
    AuthorProfile,
    /// Detail page of the post the resource belongs to.
    ParentPost,
}

impl SuccessUrl {
    pub fn resolve(self, user: &User, post_id: i64) -> Url {
        match self {
            SuccessUrl::AuthorProfile => Url::Profile(user.username.clone()),
            SuccessUrl::ParentPost => Url::PostDetail(post_id),
        }
    }
}
