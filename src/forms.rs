//! Request bodies of the mutating endpoints and their validation.
//!
//! Text inputs are trimmed before validation. Referential fields (category,
//! location) are checked against the store and reported as field errors, so a
//! rejected form always answers 422 with every problem at once.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::config::{CHARFIELD_LEN, USERNAME_LEN};
use crate::error::{Error, Result};
use crate::media::{save_post_image, ImageUpload};
use crate::models::{Post, PostFields, User};
use crate::store::BlogStore;

fn published_by_default() -> bool {
    true
}

fn finish(errors: ValidationErrors) -> Result<()> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn errors_of(result: std::result::Result<(), ValidationErrors>) -> ValidationErrors {
    result.err().unwrap_or_else(ValidationErrors::new)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, max = CHARFIELD_LEN))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub text: String,
    /// Publishing in the future schedules the post.
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
    pub location: Option<i64>,
    pub category: Option<i64>,
    #[serde(default, skip_serializing)]
    pub image: Option<ImageUpload>,
    #[serde(default, skip_serializing)]
    pub image_clear: bool,
}

impl Default for PostForm {
    fn default() -> Self {
        PostForm {
            title: String::new(),
            text: String::new(),
            pub_date: None,
            is_published: true,
            location: None,
            category: None,
            image: None,
            image_clear: false,
        }
    }
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        PostForm {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: Some(post.pub_date),
            is_published: post.is_published,
            location: post.location_id,
            category: post.category_id,
            image: None,
            image_clear: false,
        }
    }
}

impl PostForm {
    /// Validates the form and turns it into columns. `current_image` is kept
    /// unless a new image is uploaded or `image_clear` is set.
    pub fn clean(
        mut self,
        store: &dyn BlogStore,
        media_root: &Path,
        current_image: Option<String>,
    ) -> Result<PostFields> {
        self.title = self.title.trim().to_string();
        self.text = self.text.trim().to_string();

        let mut errors = errors_of(self.validate());
        if self.pub_date.is_none() {
            errors.add("pub_date", ValidationError::new("required"));
        }
        match self.category {
            None => errors.add("category", ValidationError::new("required")),
            Some(id) if store.category(id)?.is_none() => {
                errors.add("category", ValidationError::new("does_not_exist"))
            }
            Some(_) => {}
        }
        if let Some(id) = self.location {
            if store.location(id)?.is_none() {
                errors.add("location", ValidationError::new("does_not_exist"));
            }
        }
        finish(errors)?;

        let pub_date = self
            .pub_date
            .ok_or_else(|| Error::invalid("pub_date", "required"))?;
        let image = match (&self.image, self.image_clear) {
            (Some(upload), _) => Some(save_post_image(media_root, upload)?),
            (None, true) => None,
            (None, false) => current_image,
        };

        Ok(PostFields {
            title: self.title,
            text: self.text,
            pub_date,
            image,
            is_published: self.is_published,
            location_id: self.location,
            category_id: self.category,
        })
    }
}

/// Only `text` is read; author and post come from the request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub text: String,
}

impl CommentForm {
    pub fn clean(mut self) -> Result<String> {
        self.text = self.text.trim().to_string();
        self.validate()?;
        Ok(self.text)
    }
}

fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_');
    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username"))
    }
}

fn validate_optional_email(email: &str) -> std::result::Result<(), ValidationError> {
    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(min = 1, max = USERNAME_LEN), custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = USERNAME_LEN))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = USERNAME_LEN))]
    pub last_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_optional_email"))]
    pub email: String,
}

impl From<&User> for ProfileForm {
    fn from(user: &User) -> Self {
        ProfileForm {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

impl ProfileForm {
    /// `user` with the submitted profile fields applied.
    pub fn apply(mut self, user: &User) -> Result<User> {
        self.username = self.username.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.validate()?;
        Ok(User {
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            ..user.clone()
        })
    }
}
