use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DISPLAY_LEN;

/// Account owned by the external auth service; only profile fields are edited here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub api_token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// Writable columns of a post, shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// A post joined with what listings and detail pages show next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub author: String,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub post_id: i64,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentCard {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: String,
}

/// Public face of a user on their profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Profile {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: user.date_joined,
        }
    }
}

fn short(text: &str) -> &str {
    match text.char_indices().nth(DISPLAY_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short(&self.title))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short(&self.name))
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short(&self.title))
    }
}

impl fmt::Display for CommentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comment by {} on post #{}", self.author, self.comment.post_id)
    }
}
