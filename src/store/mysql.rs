use chrono::{NaiveDateTime, Utc};
use mysql::prelude::{FromValue, Queryable};
use mysql::{Pool, PooledConn, Row, Value};

use super::BlogStore;
use crate::error::{Error, Result};
use crate::models::{
    Category, Comment, CommentCard, Location, NewCategory, NewLocation, NewUser, Post, PostCard,
    PostFields, User,
};
use crate::pagination::{paginate, Page, PageRequest};
use crate::visibility::{PostQuery, PublicVisibility};

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, api_token, date_joined";
const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";
const POST_COLUMNS: &str =
    "id, title, text, pub_date, image, is_published, created_at, author_id, location_id, category_id";
const COMMENT_COLUMNS: &str = "id, text, is_published, created_at, post_id, author_id";

const CARD_FROM: &str = "FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id";

const CARD_COLUMNS: &str = "SELECT p.id, p.title, p.text, p.pub_date, p.image, p.is_published,
    p.created_at, p.author_id, p.location_id, p.category_id,
    u.username AS author,
    c.id AS c_id, c.title AS c_title, c.description AS c_description, c.slug AS c_slug,
    c.is_published AS c_is_published, c.created_at AS c_created_at,
    l.id AS l_id, l.name AS l_name, l.is_published AS l_is_published,
    l.created_at AS l_created_at,
    (SELECT COUNT(*) FROM comments m WHERE m.post_id = p.id) AS comment_count";

const DUPLICATE_ENTRY: u16 = 1062;

pub struct MySqlStore {
    pool: Pool,
}

impl MySqlStore {
    pub fn new(pool: Pool) -> Self {
        MySqlStore { pool }
    }

    fn conn(&self) -> Result<PooledConn> {
        Ok(self.pool.get_conn()?)
    }

    fn fetch_user(conn: &mut PooledConn, id: i64) -> Result<User> {
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            (id,),
        )?;
        row.map(user_from_row).ok_or(Error::NotFound)?
    }

    fn fetch_post(conn: &mut PooledConn, id: i64) -> Result<Option<Post>> {
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS),
            (id,),
        )?;
        row.map(post_from_row).transpose()
    }

    fn fetch_comment(conn: &mut PooledConn, id: i64) -> Result<Option<Comment>> {
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS),
            (id,),
        )?;
        row.map(comment_from_row).transpose()
    }
}

fn column<T: FromValue>(row: &mut Row, name: &str) -> Result<T> {
    match row.take_opt(name) {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(Error::Store(format!("column {}: {}", name, err))),
        None => Err(Error::Store(format!("missing column {}", name))),
    }
}

fn is_duplicate(err: &mysql::Error) -> bool {
    matches!(err, mysql::Error::MySqlError(e) if e.code == DUPLICATE_ENTRY)
}

/// The users column a duplicate-entry error is about.
fn duplicate_user_field(err: &mysql::Error) -> &'static str {
    match err {
        mysql::Error::MySqlError(e) if e.message.contains("api_token") => "api_token",
        _ => "username",
    }
}

fn user_from_row(mut row: Row) -> Result<User> {
    Ok(User {
        id: column(&mut row, "id")?,
        username: column(&mut row, "username")?,
        first_name: column(&mut row, "first_name")?,
        last_name: column(&mut row, "last_name")?,
        email: column(&mut row, "email")?,
        api_token: column(&mut row, "api_token")?,
        date_joined: column::<NaiveDateTime>(&mut row, "date_joined")?.and_utc(),
    })
}

fn category_from_row(mut row: Row) -> Result<Category> {
    Ok(Category {
        id: column(&mut row, "id")?,
        title: column(&mut row, "title")?,
        description: column(&mut row, "description")?,
        slug: column(&mut row, "slug")?,
        is_published: column(&mut row, "is_published")?,
        created_at: column::<NaiveDateTime>(&mut row, "created_at")?.and_utc(),
    })
}

fn location_from_row(mut row: Row) -> Result<Location> {
    Ok(Location {
        id: column(&mut row, "id")?,
        name: column(&mut row, "name")?,
        is_published: column(&mut row, "is_published")?,
        created_at: column::<NaiveDateTime>(&mut row, "created_at")?.and_utc(),
    })
}

fn post_columns(row: &mut Row) -> Result<Post> {
    Ok(Post {
        id: column(row, "id")?,
        title: column(row, "title")?,
        text: column(row, "text")?,
        pub_date: column::<NaiveDateTime>(row, "pub_date")?.and_utc(),
        image: column(row, "image")?,
        is_published: column(row, "is_published")?,
        created_at: column::<NaiveDateTime>(row, "created_at")?.and_utc(),
        author_id: column(row, "author_id")?,
        location_id: column(row, "location_id")?,
        category_id: column(row, "category_id")?,
    })
}

fn post_from_row(mut row: Row) -> Result<Post> {
    post_columns(&mut row)
}

fn card_from_row(mut row: Row) -> Result<PostCard> {
    let post = post_columns(&mut row)?;
    let author = column(&mut row, "author")?;

    let category = match column::<Option<i64>>(&mut row, "c_id")? {
        Some(id) => Some(Category {
            id,
            title: column(&mut row, "c_title")?,
            description: column(&mut row, "c_description")?,
            slug: column(&mut row, "c_slug")?,
            is_published: column(&mut row, "c_is_published")?,
            created_at: column::<NaiveDateTime>(&mut row, "c_created_at")?.and_utc(),
        }),
        None => None,
    };

    let location = match column::<Option<i64>>(&mut row, "l_id")? {
        Some(id) => Some(Location {
            id,
            name: column(&mut row, "l_name")?,
            is_published: column(&mut row, "l_is_published")?,
            created_at: column::<NaiveDateTime>(&mut row, "l_created_at")?.and_utc(),
        }),
        None => None,
    };

    Ok(PostCard {
        post,
        author,
        category,
        location,
        comment_count: column(&mut row, "comment_count")?,
    })
}

fn comment_from_row(mut row: Row) -> Result<Comment> {
    Ok(Comment {
        id: column(&mut row, "id")?,
        text: column(&mut row, "text")?,
        is_published: column(&mut row, "is_published")?,
        created_at: column::<NaiveDateTime>(&mut row, "created_at")?.and_utc(),
        post_id: column(&mut row, "post_id")?,
        author_id: column(&mut row, "author_id")?,
    })
}

impl BlogStore for MySqlStore {
    fn ping(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let result: Option<u8> = conn.query_first("SELECT 1")?;
        match result {
            Some(1) => Ok(()),
            _ => Err(Error::Store("unexpected ping result".to_string())),
        }
    }

    fn create_user(&self, new: NewUser) -> Result<User> {
        let mut conn = self.conn()?;
        let result = conn.exec_drop(
            "INSERT INTO users (username, first_name, last_name, email, api_token, date_joined)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &new.username,
                &new.first_name,
                &new.last_name,
                &new.email,
                &new.api_token,
                Utc::now().naive_utc(),
            ),
        );
        match result {
            Ok(()) => {
                let id = conn.last_insert_id() as i64;
                tracing::info!("created user {} ({})", id, &new.username);
                Self::fetch_user(&mut conn, id)
            }
            Err(err) if is_duplicate(&err) => {
                Err(Error::invalid(duplicate_user_field(&err), "unique"))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM users WHERE api_token = ?", USER_COLUMNS),
            (token,),
        )?;
        row.map(user_from_row).transpose()
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS),
            (username,),
        )?;
        row.map(user_from_row).transpose()
    }

    fn update_user(&self, user: &User) -> Result<User> {
        let mut conn = self.conn()?;
        let result = conn.exec_drop(
            "UPDATE users SET username = ?, first_name = ?, last_name = ?, email = ? WHERE id = ?",
            (
                &user.username,
                &user.first_name,
                &user.last_name,
                &user.email,
                user.id,
            ),
        );
        match result {
            Ok(()) => Self::fetch_user(&mut conn, user.id),
            Err(err) if is_duplicate(&err) => Err(Error::invalid("username", "unique")),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM users WHERE id = ?", (id,))?;
        tracing::info!("deleted user {}", id);
        Ok(())
    }

    fn create_category(&self, new: NewCategory) -> Result<Category> {
        let mut conn = self.conn()?;
        let result = conn.exec_drop(
            "INSERT INTO categories (title, description, slug, is_published, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                &new.title,
                &new.description,
                &new.slug,
                new.is_published,
                Utc::now().naive_utc(),
            ),
        );
        match result {
            Ok(()) => {
                let id = conn.last_insert_id() as i64;
                drop(conn);
                self.category(id)?.ok_or(Error::NotFound)
            }
            Err(err) if is_duplicate(&err) => Err(Error::invalid("slug", "unique")),
            Err(err) => Err(err.into()),
        }
    }

    fn category(&self, id: i64) -> Result<Option<Category>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS),
            (id,),
        )?;
        row.map(category_from_row).transpose()
    }

    fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS),
            (slug,),
        )?;
        row.map(category_from_row).transpose()
    }

    fn categories(&self) -> Result<Vec<Category>> {
        let mut conn = self.conn()?;
        let rows: Vec<Row> = conn.query(format!(
            "SELECT {} FROM categories ORDER BY id",
            CATEGORY_COLUMNS
        ))?;
        rows.into_iter().map(category_from_row).collect()
    }

    fn delete_category(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM categories WHERE id = ?", (id,))?;
        Ok(())
    }

    fn create_location(&self, new: NewLocation) -> Result<Location> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)",
            (&new.name, new.is_published, Utc::now().naive_utc()),
        )?;
        let id = conn.last_insert_id() as i64;
        drop(conn);
        self.location(id)?.ok_or(Error::NotFound)
    }

    fn location(&self, id: i64) -> Result<Option<Location>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS),
            (id,),
        )?;
        row.map(location_from_row).transpose()
    }

    fn locations(&self) -> Result<Vec<Location>> {
        let mut conn = self.conn()?;
        let rows: Vec<Row> = conn.query(format!(
            "SELECT {} FROM locations ORDER BY id",
            LOCATION_COLUMNS
        ))?;
        rows.into_iter().map(location_from_row).collect()
    }

    fn delete_location(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM locations WHERE id = ?", (id,))?;
        Ok(())
    }

    fn list_posts(&self, query: &PostQuery, page: PageRequest) -> Result<Page<PostCard>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(author_id) = query.author_id {
            conditions.push("p.author_id = ?");
            values.push(author_id.into());
        }
        if let Some(category_id) = query.category_id {
            conditions.push("p.category_id = ?");
            values.push(category_id.into());
        }
        if let Some(visibility) = query.visibility {
            conditions.push(PublicVisibility::SQL);
            values.push(visibility.now().naive_utc().into());
        }
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let mut conn = self.conn()?;
        let count: Option<u64> = conn.exec_first(
            format!(
                "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id {}",
                filter
            ),
            values.clone(),
        )?;
        tracing::debug!("listing posts {:?}: {:?} rows", query, count);

        paginate(count.unwrap_or(0), page, |offset, limit| {
            values.push(limit.into());
            values.push(offset.into());
            let rows: Vec<Row> = conn.exec(
                format!(
                    "{} {} {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
                    CARD_COLUMNS, CARD_FROM, filter
                ),
                values,
            )?;
            rows.into_iter().map(card_from_row).collect()
        })
    }

    fn post(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.conn()?;
        Self::fetch_post(&mut conn, id)
    }

    fn post_card(&self, id: i64) -> Result<Option<PostCard>> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!("{} {} WHERE p.id = ?", CARD_COLUMNS, CARD_FROM),
            (id,),
        )?;
        row.map(card_from_row).transpose()
    }

    fn create_post(&self, author_id: i64, fields: PostFields) -> Result<Post> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO posts
                (title, text, pub_date, image, is_published, created_at, author_id, location_id, category_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                &fields.title,
                &fields.text,
                fields.pub_date.naive_utc(),
                &fields.image,
                fields.is_published,
                Utc::now().naive_utc(),
                author_id,
                fields.location_id,
                fields.category_id,
            ),
        )?;
        let id = conn.last_insert_id() as i64;
        Self::fetch_post(&mut conn, id)?.ok_or(Error::NotFound)
    }

    fn update_post(&self, id: i64, fields: PostFields) -> Result<Post> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "UPDATE posts SET title = ?, text = ?, pub_date = ?, image = ?, is_published = ?,
                location_id = ?, category_id = ?
             WHERE id = ?",
            (
                &fields.title,
                &fields.text,
                fields.pub_date.naive_utc(),
                &fields.image,
                fields.is_published,
                fields.location_id,
                fields.category_id,
                id,
            ),
        )?;
        Self::fetch_post(&mut conn, id)?.ok_or(Error::NotFound)
    }

    fn delete_post(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM posts WHERE id = ?", (id,))?;
        Ok(())
    }

    fn comments_for(&self, post_id: i64) -> Result<Vec<CommentCard>> {
        let mut conn = self.conn()?;
        let rows: Vec<Row> = conn.exec(
            "SELECT m.id, m.text, m.is_published, m.created_at, m.post_id, m.author_id,
                u.username AS author
             FROM comments m JOIN users u ON u.id = m.author_id
             WHERE m.post_id = ?
             ORDER BY m.created_at, m.id",
            (post_id,),
        )?;
        rows.into_iter()
            .map(|mut row| {
                let author = column(&mut row, "author")?;
                Ok(CommentCard {
                    comment: comment_from_row(row)?,
                    author,
                })
            })
            .collect()
    }

    fn comment(&self, id: i64) -> Result<Option<Comment>> {
        let mut conn = self.conn()?;
        Self::fetch_comment(&mut conn, id)
    }

    fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> Result<Comment> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO comments (text, is_published, created_at, post_id, author_id)
             VALUES (?, TRUE, ?, ?, ?)",
            (&text, Utc::now().naive_utc(), post_id, author_id),
        )?;
        let id = conn.last_insert_id() as i64;
        Self::fetch_comment(&mut conn, id)?.ok_or(Error::NotFound)
    }

    fn update_comment(&self, id: i64, text: String) -> Result<Comment> {
        let mut conn = self.conn()?;
        conn.exec_drop("UPDATE comments SET text = ? WHERE id = ?", (&text, id))?;
        Self::fetch_comment(&mut conn, id)?.ok_or(Error::NotFound)
    }

    fn delete_comment(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM comments WHERE id = ?", (id,))?;
        Ok(())
    }
}
