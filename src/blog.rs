use std::{fmt, result, sync::Arc};

use log::{error, info, trace, warn};
use tokio::task;
use warp::http;

use crate::auth;
use crate::backend::{Backend, FindError};
use crate::post::{Post, PostForm};
use crate::session::{Session, SessionToken, Sessions};
use crate::templates::Pages;
use crate::time::Timestamp;

/// Everything a request handler needs, shared between requests.
pub struct Blog {
    backend: Backend,
    sessions: Sessions,
    pages: Pages,
}

/// Proof the request carried a logged-in session: the only way to reach the
/// mutating operations.
pub struct BlogAuthed {
    blog: Arc<Blog>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Internal,
    NotFound,
    Unauthorized,
    Invalid(&'static str),
}

pub type Result<T> = result::Result<T, Error>;

impl From<Error> for http::StatusCode {
    fn from(e: Error) -> Self {
        match e {
            Error::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
            // a missing post is an ordinary page, not a fault
            Error::NotFound => http::StatusCode::OK,
            // sent on to the login form
            Error::Unauthorized => http::StatusCode::SEE_OTHER,
            // the form comes back with the message
            Error::Invalid(_) => http::StatusCode::OK,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Internal => write!(fmt, "Something went wrong"),
            Error::NotFound => write!(fmt, "Post not found"),
            Error::Unauthorized => write!(fmt, "Invalid credentials"),
            Error::Invalid(msg) => write!(fmt, "{msg}"),
        }
    }
}

impl From<FindError> for Error {
    fn from(e: FindError) -> Self {
        match e {
            FindError::NotFound => Error::NotFound,
            FindError::Internal => Error::Internal,
        }
    }
}

impl Blog {
    pub fn new(backend: Backend, sessions: Sessions, pages: Pages) -> Self {
        Self {
            backend,
            sessions,
            pages,
        }
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Create the first user if there are none. Returns whether one was made.
    pub async fn seed_user(&self, username: &str, password: &str) -> Result<bool> {
        let count = self
            .backend
            .user_count()
            .await
            .map_err(|()| Error::Internal)?;

        if count > 0 {
            trace!("{count} users present, not seeding");
            return Ok(false);
        }

        let password = password.to_owned();
        let pwhash = task::spawn_blocking(move || auth::hash_password(&password))
            .await
            .map_err(|e| {
                error!("password hashing task failed: {e:?}");
                Error::Internal
            })?
            .map_err(|()| Error::Internal)?;

        self.backend
            .create_user(username, &pwhash)
            .await
            .map_err(|()| Error::Internal)?;

        info!("created user {username}");
        Ok(true)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionToken> {
        let user = self.backend.find_user(username).await.map_err(|e| {
            if matches!(e, FindError::NotFound) {
                warn!("rejecting login for non-existent user {}", username);
                Error::Unauthorized
            } else {
                Error::Internal
            }
        })?;

        let password = password.to_owned();
        let pwhash = user.pwhash;
        let verified = task::spawn_blocking(move || auth::verify_password(&password, &pwhash))
            .await
            .map_err(|e| {
                error!("password verification task failed: {e:?}");
                Error::Internal
            })?;

        if !verified {
            warn!("wrong password for user {}", username);
            return Err(Error::Unauthorized);
        }

        info!("{username} (id {}) login", user.id);
        Ok(self.sessions.issue())
    }

    pub fn logout(&self) -> SessionToken {
        self.sessions.logout()
    }

    pub fn session(&self, cookie: Option<&str>) -> Session {
        self.sessions.validate(cookie)
    }

    pub fn authenticate(self: &Arc<Self>, cookie: Option<&str>) -> Result<BlogAuthed> {
        if self.session(cookie).logged_in {
            Ok(BlogAuthed {
                blog: Arc::clone(self),
            })
        } else {
            Err(Error::Unauthorized)
        }
    }

    pub async fn posts(&self) -> Result<Vec<Post>> {
        let posts = self.backend.posts().await.map_err(|()| Error::Internal)?;
        trace!("listing {} posts", posts.len());
        Ok(posts)
    }

    pub async fn post(&self, id: i64) -> Result<Post> {
        self.backend
            .post(id)
            .await
            .map_err(|()| Error::Internal)?
            .ok_or_else(|| {
                info!("post {id} not found");
                Error::NotFound
            })
    }
}

impl BlogAuthed {
    pub async fn create_post(&self, form: &PostForm) -> Result<Post> {
        form.validate().map_err(Error::Invalid)?;

        let post = self
            .blog
            .backend
            .create_post(&form.render(Timestamp::now()))
            .await
            .map_err(|()| Error::Internal)?;

        info!("created post {}: {:?}", post.id, post.title);
        Ok(post)
    }

    pub async fn update_post(&self, id: i64, form: &PostForm) -> Result<Post> {
        // a missing post outranks a bad form
        self.blog.post(id).await?;
        form.validate().map_err(Error::Invalid)?;

        let post = self
            .blog
            .backend
            .update_post(id, &form.render(Timestamp::now()))
            .await?;

        info!("updated post {id}: {:?}", post.title);
        Ok(post)
    }

    pub async fn delete_post(&self, id: i64) -> Result<()> {
        self.blog.backend.delete_post(id).await?;

        info!("deleted post {id}");
        Ok(())
    }
}
