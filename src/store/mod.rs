//! # Storage Layer
//!
//! Every handler reaches the database through the [`BlogStore`] trait.
//!
//! ## Implementations
//!
//! - [`mysql::MySqlStore`]: production store over a `mysql::Pool`; foreign
//!   keys in `migrations/` carry the cascade rules.
//! - [`memory::MemoryStore`]: in-process tables for tests and `memory://`
//!   runs; applies the same cascades by hand.
//!
//! ## Delete semantics
//!
//! - user: their posts, their comments and comments on their posts go with them
//! - post: its comments go with it
//! - category / location: posts keep existing with the reference cleared

use crate::error::Result;
use crate::models::{
    Category, Comment, CommentCard, Location, NewCategory, NewLocation, NewUser, Post, PostCard,
    PostFields, User,
};
use crate::pagination::{Page, PageRequest};
use crate::visibility::PostQuery;

pub mod memory;
pub mod mysql;

pub use self::memory::MemoryStore;
pub use self::mysql::MySqlStore;

pub trait BlogStore: Send + Sync {
    /// Cheap round trip used by the health check.
    fn ping(&self) -> Result<()>;

    fn create_user(&self, new: NewUser) -> Result<User>;
    fn user_by_token(&self, token: &str) -> Result<Option<User>>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Saves the profile fields of `user`. A username taken by someone else
    /// is a validation error on `username`.
    fn update_user(&self, user: &User) -> Result<User>;
    fn delete_user(&self, id: i64) -> Result<()>;

    fn create_category(&self, new: NewCategory) -> Result<Category>;
    fn category(&self, id: i64) -> Result<Option<Category>>;
    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    fn categories(&self) -> Result<Vec<Category>>;
    fn delete_category(&self, id: i64) -> Result<()>;

    fn create_location(&self, new: NewLocation) -> Result<Location>;
    fn location(&self, id: i64) -> Result<Option<Location>>;
    fn locations(&self) -> Result<Vec<Location>>;
    fn delete_location(&self, id: i64) -> Result<()>;

    /// One page of posts matching `query`, newest first, with comment counts.
    fn list_posts(&self, query: &PostQuery, page: PageRequest) -> Result<Page<PostCard>>;
    fn post(&self, id: i64) -> Result<Option<Post>>;
    fn post_card(&self, id: i64) -> Result<Option<PostCard>>;
    fn create_post(&self, author_id: i64, fields: PostFields) -> Result<Post>;
    fn update_post(&self, id: i64, fields: PostFields) -> Result<Post>;
    fn delete_post(&self, id: i64) -> Result<()>;

    /// Comments of a post, oldest first.
    fn comments_for(&self, post_id: i64) -> Result<Vec<CommentCard>>;
    fn comment(&self, id: i64) -> Result<Option<Comment>>;
    fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> Result<Comment>;
    fn update_comment(&self, id: i64, text: String) -> Result<Comment>;
    fn delete_comment(&self, id: i64) -> Result<()>;
}
