//! Which posts a reader may see.
//!
//! A post is public when it is published, filed under a published category,
//! and its publication date has passed. Every listing goes through
//! [`PostQuery`], so the home page, category pages and visitor views of a
//! profile apply exactly the same rule. Authors bypass it only on the detail
//! page of their own posts.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{Category, Post, PostCard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicVisibility {
    now: DateTime<Utc>,
}

impl PublicVisibility {
    /// SQL form of [`PublicVisibility::admits`]; `p` is posts, `c` the
    /// left-joined category, and the single parameter is [`Self::now`].
    pub const SQL: &'static str =
        "p.is_published = TRUE AND c.is_published = TRUE AND p.pub_date <= ?";

    pub fn at(now: DateTime<Utc>) -> Self {
        PublicVisibility { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn admits(&self, post: &Post, category: Option<&Category>) -> bool {
        post.is_published
            && category.is_some_and(|category| category.is_published)
            && post.pub_date <= self.now
    }

    pub fn admits_card(&self, card: &PostCard) -> bool {
        self.admits(&card.post, card.category.as_ref())
    }
}

/// Filter for a post listing. Results are always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub visibility: Option<PublicVisibility>,
}

impl PostQuery {
    pub fn public(now: DateTime<Utc>) -> Self {
        PostQuery {
            visibility: Some(PublicVisibility::at(now)),
            ..Default::default()
        }
    }

    /// Every post of one author, hidden and scheduled ones included.
    pub fn by_author(author_id: i64) -> Self {
        PostQuery {
            author_id: Some(author_id),
            ..Default::default()
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn visible_at(mut self, now: DateTime<Utc>) -> Self {
        self.visibility = Some(PublicVisibility::at(now));
        self
    }

    pub fn matches(&self, card: &PostCard) -> bool {
        self.author_id.map_or(true, |id| card.post.author_id == id)
            && self
                .category_id
                .map_or(true, |id| card.post.category_id == Some(id))
            && self
                .visibility
                .map_or(true, |visibility| visibility.admits_card(card))
    }
}

/// Listing order: latest publication date first, newer rows break ties.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.pub_date.cmp(&a.pub_date).then_with(|| b.id.cmp(&a.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn category(is_published: bool) -> Category {
        Category {
            id: 1,
            title: "Travel".to_string(),
            description: String::new(),
            slug: "travel".to_string(),
            is_published,
            created_at: Utc::now(),
        }
    }

    fn post(is_published: bool, pub_date: DateTime<Utc>) -> Post {
        Post {
            id: 1,
            title: "Title".to_string(),
            text: "Text".to_string(),
            pub_date,
            image: None,
            is_published,
            created_at: Utc::now(),
            author_id: 1,
            location_id: None,
            category_id: Some(1),
        }
    }

    #[test]
    fn all_three_conditions_are_required() {
        let now = Utc::now();
        let visibility = PublicVisibility::at(now);
        let past = now - Duration::hours(1);

        assert!(visibility.admits(&post(true, past), Some(&category(true))));
        assert!(!visibility.admits(&post(false, past), Some(&category(true))));
        assert!(!visibility.admits(&post(true, past), Some(&category(false))));
        assert!(!visibility.admits(&post(true, now + Duration::hours(1)), Some(&category(true))));
    }

    #[test]
    fn pub_date_equal_to_now_is_visible() {
        let now = Utc::now();
        assert!(PublicVisibility::at(now).admits(&post(true, now), Some(&category(true))));
    }

    #[test]
    fn uncategorized_posts_are_not_public() {
        let now = Utc::now();
        assert!(!PublicVisibility::at(now).admits(&post(true, now - Duration::days(1)), None));
    }

    #[test]
    fn query_combines_filters() {
        let now = Utc::now();
        let card = PostCard {
            post: post(true, now - Duration::minutes(5)),
            author: "leo".to_string(),
            category: Some(category(true)),
            location: None,
            comment_count: 0,
        };

        assert!(PostQuery::public(now).matches(&card));
        assert!(PostQuery::public(now).in_category(1).matches(&card));
        assert!(!PostQuery::public(now).in_category(2).matches(&card));
        assert!(PostQuery::by_author(1).matches(&card));
        assert!(!PostQuery::by_author(2).visible_at(now).matches(&card));

        let hidden = PostCard {
            post: post(false, now),
            ..card
        };
        assert!(PostQuery::by_author(1).matches(&hidden));
        assert!(!PostQuery::by_author(1).visible_at(now).matches(&hidden));
    }

    #[test]
    fn ordering_is_newest_first() {
        let now = Utc::now();
        let older = post(true, now - Duration::days(2));
        let mut newer = post(true, now - Duration::days(1));
        newer.id = 2;
        let mut posts = vec![older.clone(), newer.clone()];
        posts.sort_by(newest_first);
        assert_eq!(posts, vec![newer, older]);
    }
}
