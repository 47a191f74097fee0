use serde::{Deserialize, Serialize};

use crate::markdown;
use crate::time::Timestamp;

pub const TITLE_MAX: usize = 50;
pub const SUBTITLE_MAX: usize = 50;
pub const AUTHOR_MAX: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[derive(sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date_posted: Timestamp,
    /// Rendered html.
    pub content: String,
    /// Markdown `content` was rendered from.
    #[serde(skip)]
    pub source: String,
}

/// What an author submits from the add/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Markdown.
    pub content: String,
}

/// A validated, rendered form, ready to be written.
#[derive(Debug)]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub author: &'a str,
    pub date_posted: Timestamp,
    pub content: String,
    pub source: &'a str,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        let too_long = |s: &str, max| s.chars().count() > max;

        if too_long(&self.title, TITLE_MAX) {
            return Err("Title must be at most 50 characters");
        }
        if too_long(&self.subtitle, SUBTITLE_MAX) {
            return Err("Subtitle must be at most 50 characters");
        }
        if too_long(&self.author, AUTHOR_MAX) {
            return Err("Author must be at most 20 characters");
        }
        Ok(())
    }

    pub fn render(&self, date_posted: Timestamp) -> NewPost<'_> {
        NewPost {
            title: &self.title,
            subtitle: &self.subtitle,
            author: &self.author,
            date_posted,
            content: markdown::render(&self.content),
            source: &self.content,
        }
    }
}

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            content: post.source.clone(),
        }
    }
}
