use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::BlogStore;
use crate::error::{Error, Result};
use crate::models::{
    Category, Comment, CommentCard, Location, NewCategory, NewLocation, NewUser, Post, PostCard,
    PostFields, User,
};
use crate::pagination::{paginate, Page, PageRequest};
use crate::visibility::{newest_first, PostQuery};

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    categories: Table<Category>,
    locations: Table<Location>,
    posts: Table<Post>,
    comments: Table<Comment>,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .rows
            .values()
            .any(|user| user.username == username && Some(user.id) != except)
    }

    fn card(&self, post: &Post) -> Result<PostCard> {
        let author = self
            .users
            .rows
            .get(&post.author_id)
            .ok_or_else(|| Error::Store(format!("post {} has no author", post.id)))?;
        Ok(PostCard {
            post: post.clone(),
            author: author.username.clone(),
            category: post
                .category_id
                .and_then(|id| self.categories.rows.get(&id).cloned()),
            location: post
                .location_id
                .and_then(|id| self.locations.rows.get(&id).cloned()),
            comment_count: self
                .comments
                .rows
                .values()
                .filter(|comment| comment.post_id == post.id)
                .count() as i64,
        })
    }

    fn remove_post(&mut self, id: i64) {
        self.posts.rows.remove(&id);
        self.comments.rows.retain(|_, comment| comment.post_id != id);
    }
}

/// In-process store with the same semantics as the MySQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Store("memory store lock poisoned".to_string()))
    }
}

impl BlogStore for MemoryStore {
    fn ping(&self) -> Result<()> {
        self.tables().map(|_| ())
    }

    fn create_user(&self, new: NewUser) -> Result<User> {
        let mut tables = self.tables()?;
        if tables.username_taken(&new.username, None) {
            return Err(Error::invalid("username", "unique"));
        }
        if tables.users.rows.values().any(|user| user.api_token == new.api_token) {
            return Err(Error::invalid("api_token", "unique"));
        }
        let user = User {
            id: tables.users.next_id(),
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            api_token: new.api_token,
            date_joined: Utc::now(),
        };
        tables.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .rows
            .values()
            .find(|user| user.api_token == token)
            .cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .rows
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    fn update_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables()?;
        if tables.username_taken(&user.username, Some(user.id)) {
            return Err(Error::invalid("username", "unique"));
        }
        let row = tables.users.rows.get_mut(&user.id).ok_or(Error::NotFound)?;
        row.username = user.username.clone();
        row.first_name = user.first_name.clone();
        row.last_name = user.last_name.clone();
        row.email = user.email.clone();
        Ok(row.clone())
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let mut tables = self.tables()?;
        tables.users.rows.remove(&id);
        let authored: Vec<i64> = tables
            .posts
            .rows
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        tables.comments.rows.retain(|_, comment| comment.author_id != id);
        Ok(())
    }

    fn create_category(&self, new: NewCategory) -> Result<Category> {
        let mut tables = self.tables()?;
        if tables.categories.rows.values().any(|c| c.slug == new.slug) {
            return Err(Error::invalid("slug", "unique"));
        }
        let category = Category {
            id: tables.categories.next_id(),
            title: new.title,
            description: new.description,
            slug: new.slug,
            is_published: new.is_published,
            created_at: Utc::now(),
        };
        tables.categories.rows.insert(category.id, category.clone());
        Ok(category)
    }

    fn category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.tables()?.categories.rows.get(&id).cloned())
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let tables = self.tables()?;
        Ok(tables
            .categories
            .rows
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.tables()?.categories.rows.values().cloned().collect())
    }

    fn delete_category(&self, id: i64) -> Result<()> {
        let mut tables = self.tables()?;
        tables.categories.rows.remove(&id);
        for post in tables.posts.rows.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(())
    }

    fn create_location(&self, new: NewLocation) -> Result<Location> {
        let mut tables = self.tables()?;
        let location = Location {
            id: tables.locations.next_id(),
            name: new.name,
            is_published: new.is_published,
            created_at: Utc::now(),
        };
        tables.locations.rows.insert(location.id, location.clone());
        Ok(location)
    }

    fn location(&self, id: i64) -> Result<Option<Location>> {
        Ok(self.tables()?.locations.rows.get(&id).cloned())
    }

    fn locations(&self) -> Result<Vec<Location>> {
        Ok(self.tables()?.locations.rows.values().cloned().collect())
    }

    fn delete_location(&self, id: i64) -> Result<()> {
        let mut tables = self.tables()?;
        tables.locations.rows.remove(&id);
        for post in tables.posts.rows.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(())
    }

    fn list_posts(&self, query: &PostQuery, page: PageRequest) -> Result<Page<PostCard>> {
        let tables = self.tables()?;
        let mut cards = Vec::new();
        for post in tables.posts.rows.values() {
            let card = tables.card(post)?;
            if query.matches(&card) {
                cards.push(card);
            }
        }
        cards.sort_by(|a, b| newest_first(&a.post, &b.post));
        paginate(cards.len() as u64, page, |offset, limit| {
            Ok(cards
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        })
    }

    fn post(&self, id: i64) -> Result<Option<Post>> {
        Ok(self.tables()?.posts.rows.get(&id).cloned())
    }

    fn post_card(&self, id: i64) -> Result<Option<PostCard>> {
        let tables = self.tables()?;
        tables
            .posts
            .rows
            .get(&id)
            .map(|post| tables.card(post))
            .transpose()
    }

    fn create_post(&self, author_id: i64, fields: PostFields) -> Result<Post> {
        let mut tables = self.tables()?;
        if !tables.users.rows.contains_key(&author_id) {
            return Err(Error::Store(format!("no user {}", author_id)));
        }
        let post = Post {
            id: tables.posts.next_id(),
            title: fields.title,
            text: fields.text,
            pub_date: fields.pub_date,
            image: fields.image,
            is_published: fields.is_published,
            created_at: Utc::now(),
            author_id,
            location_id: fields.location_id,
            category_id: fields.category_id,
        };
        tables.posts.rows.insert(post.id, post.clone());
        Ok(post)
    }

    fn update_post(&self, id: i64, fields: PostFields) -> Result<Post> {
        let mut tables = self.tables()?;
        let post = tables.posts.rows.get_mut(&id).ok_or(Error::NotFound)?;
        post.title = fields.title;
        post.text = fields.text;
        post.pub_date = fields.pub_date;
        post.image = fields.image;
        post.is_published = fields.is_published;
        post.location_id = fields.location_id;
        post.category_id = fields.category_id;
        Ok(post.clone())
    }

    fn delete_post(&self, id: i64) -> Result<()> {
        self.tables()?.remove_post(id);
        Ok(())
    }

    fn comments_for(&self, post_id: i64) -> Result<Vec<CommentCard>> {
        let tables = self.tables()?;
        let mut comments: Vec<&Comment> = tables
            .comments
            .rows
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
            .into_iter()
            .map(|comment| {
                let author = tables
                    .users
                    .rows
                    .get(&comment.author_id)
                    .ok_or_else(|| Error::Store(format!("comment {} has no author", comment.id)))?;
                Ok(CommentCard {
                    comment: comment.clone(),
                    author: author.username.clone(),
                })
            })
            .collect()
    }

    fn comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.tables()?.comments.rows.get(&id).cloned())
    }

    fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> Result<Comment> {
        let mut tables = self.tables()?;
        if !tables.posts.rows.contains_key(&post_id) {
            return Err(Error::NotFound);
        }
        let comment = Comment {
            id: tables.comments.next_id(),
            text,
            is_published: true,
            created_at: Utc::now(),
            post_id,
            author_id,
        };
        tables.comments.rows.insert(comment.id, comment.clone());
        Ok(comment)
    }

    fn update_comment(&self, id: i64, text: String) -> Result<Comment> {
        let mut tables = self.tables()?;
        let comment = tables.comments.rows.get_mut(&id).ok_or(Error::NotFound)?;
        comment.text = text;
        Ok(comment.clone())
    }

    fn delete_comment(&self, id: i64) -> Result<()> {
        self.tables()?.comments.rows.remove(&id);
        Ok(())
    }
}
