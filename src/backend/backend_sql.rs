use std::future::Future;
use std::path::Path;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{query, query_as, Pool, Sqlite, SqliteConnection, SqlitePool, Transaction};

use log::{error, info};

use crate::backend::FindError;
use crate::post::{NewPost, Post};
use crate::user::User;

type Result<T> = std::result::Result<T, ()>;

pub struct Backend(pub Pool<Sqlite>);

const DB_FILE: &str = "blog.db";

impl Backend {
    pub async fn new(data_dir: &Path) -> std::result::Result<Self, sqlx::Error> {
        let path = data_dir.join(DB_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Using {}", path.display());
        Ok(Self(pool))
    }
}

impl Backend {
    async fn transact<R, T, F>(&self, transaction: T) -> Result<R>
    where
        T: FnOnce(Transaction<'static, Sqlite>) -> F,
        F: Future<Output = Result<(Transaction<'static, Sqlite>, R)>>,
    {
        let tx = self.0.begin().await.map_err(|e| {
            error!("error beginning transaction: {:?}", e);
        })?;

        let (tx, r) = transaction(tx).await?;

        tx.commit().await.map_err(|e| {
            error!("error committing transaction: {:?}", e);
        })?;

        Ok(r)
    }
}

impl Backend {
    pub async fn find_user(&self, username: &str) -> std::result::Result<User, FindError> {
        query_as(
            "
            SELECT id, username, pwhash
            FROM users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_one(&self.0)
        .await
        .map_err(|e| {
            if matches!(e, sqlx::Error::RowNotFound) {
                FindError::NotFound
            } else {
                error!("couldn't look up user {username}: {e:?}");
                FindError::Internal
            }
        })
    }

    pub async fn user_count(&self) -> Result<i64> {
        query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.0)
            .await
            .map(|(count,): (i64,)| count)
            .map_err(|e| {
                error!("couldn't count users: {e:?}");
            })
    }

    pub async fn create_user(&self, username: &str, pwhash: &str) -> Result<()> {
        query(
            "
            INSERT INTO users
            (username, pwhash)
            VALUES
            (?, ?)
            ",
        )
        .bind(username)
        .bind(pwhash)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("couldn't create user {username}: {e:?}");
        })
    }
}

async fn select_post(conn: &mut SqliteConnection, id: i64) -> Result<Option<Post>> {
    query_as(
        "
        SELECT id, title, subtitle, author, date_posted, content, source
        FROM posts
        WHERE id = ?
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        error!("error selecting post {id}: {e:?}");
    })
}

impl Backend {
    /// Newest first. Posts stamped in the same second come out in reverse
    /// creation order.
    pub async fn posts(&self) -> Result<Vec<Post>> {
        query_as(
            "
            SELECT id, title, subtitle, author, date_posted, content, source
            FROM posts
            ORDER BY date_posted DESC, id DESC
            ",
        )
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting posts: {e:?}");
        })
    }

    pub async fn post(&self, id: i64) -> Result<Option<Post>> {
        let mut conn = self.0.acquire().await.map_err(|e| {
            error!("couldn't acquire connection: {e:?}");
        })?;

        select_post(&mut conn, id).await
    }

    pub async fn create_post(&self, post: &NewPost<'_>) -> Result<Post> {
        self.transact(|mut tx| async move {
            let id = query(
                "
                INSERT INTO posts
                (title, subtitle, author, date_posted, content, source)
                VALUES
                (?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(post.title)
            .bind(post.subtitle)
            .bind(post.author)
            .bind(post.date_posted)
            .bind(&post.content)
            .bind(post.source)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("error inserting post: {e:?}");
            })?
            .last_insert_rowid();

            let created = select_post(&mut tx, id).await?.ok_or_else(|| {
                error!("post {id} vanished mid-transaction");
            })?;

            Ok((tx, created))
        })
        .await
    }

    pub async fn update_post(
        &self,
        id: i64,
        post: &NewPost<'_>,
    ) -> std::result::Result<Post, FindError> {
        self.transact(|mut tx| async move {
            let updated = query(
                "
                UPDATE posts
                SET
                    title = ?,
                    subtitle = ?,
                    author = ?,
                    date_posted = ?,
                    content = ?,
                    source = ?
                WHERE id = ?
                ",
            )
            .bind(post.title)
            .bind(post.subtitle)
            .bind(post.author)
            .bind(post.date_posted)
            .bind(&post.content)
            .bind(post.source)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("error updating post {id}: {e:?}");
            })?
            .rows_affected();

            if updated == 0 {
                return Ok((tx, None));
            }

            let post = select_post(&mut tx, id).await?;
            Ok((tx, post))
        })
        .await
        .map_err(|()| FindError::Internal)?
        .ok_or(FindError::NotFound)
    }

    pub async fn delete_post(&self, id: i64) -> std::result::Result<(), FindError> {
        let deleted = query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(|e| {
                error!("error deleting post {id}: {e:?}");
                FindError::Internal
            })?
            .rows_affected();

        match deleted {
            0 => Err(FindError::NotFound),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub mod test {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::post::PostForm;
    use crate::time::Timestamp;

    pub async fn create_backend() -> Backend {
        // every connection to :memory: is its own database, so keep exactly one
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(":memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        Backend(db)
    }

    fn form(title: &str) -> PostForm {
        PostForm {
            title: title.into(),
            subtitle: format!("{title} subtitle"),
            author: "rob".into(),
            content: format!("# {title}"),
        }
    }

    #[tokio::test]
    async fn newest_post_lists_first() {
        let backend = create_backend().await;

        assert!(backend.posts().await.unwrap().is_empty());

        let old = backend
            .create_post(&form("old").render(Timestamp::from_i64(100)))
            .await
            .unwrap();
        let new = backend
            .create_post(&form("new").render(Timestamp::from_i64(200)))
            .await
            .unwrap();
        // same second as `new`, created later
        let newer = backend
            .create_post(&form("newer").render(Timestamp::from_i64(200)))
            .await
            .unwrap();

        let ids: Vec<_> = backend.posts().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, [newer.id, new.id, old.id]);
    }

    #[tokio::test]
    async fn create_assigns_ids_and_renders() {
        let backend = create_backend().await;

        let f = form("first");
        let post = backend
            .create_post(&f.render(Timestamp::from_i64(7)))
            .await
            .unwrap();

        assert_eq!(post.title, "first");
        assert_eq!(post.subtitle, "first subtitle");
        assert_eq!(post.author, "rob");
        assert_eq!(post.date_posted, Timestamp::from_i64(7));
        assert_eq!(post.content, "<h1>first</h1>\n");
        assert_eq!(post.source, "# first");

        let second = backend
            .create_post(&form("second").render(Timestamp::from_i64(8)))
            .await
            .unwrap();
        assert_ne!(post.id, second.id);
    }

    #[tokio::test]
    async fn get_after_delete_is_absent() {
        let backend = create_backend().await;

        let post = backend
            .create_post(&form("doomed").render(Timestamp::from_i64(1)))
            .await
            .unwrap();
        assert!(backend.post(post.id).await.unwrap().is_some());

        backend.delete_post(post.id).await.unwrap();

        assert!(backend.post(post.id).await.unwrap().is_none());
        assert_eq!(backend.delete_post(post.id).await, Err(FindError::NotFound));

        // ids aren't recycled
        let next = backend
            .create_post(&form("next").render(Timestamp::from_i64(2)))
            .await
            .unwrap();
        assert!(next.id > post.id);
    }

    #[tokio::test]
    async fn update_overwrites_everything() {
        let backend = create_backend().await;

        let post = backend
            .create_post(&form("before").render(Timestamp::from_i64(1)))
            .await
            .unwrap();

        let replacement = PostForm {
            title: "after".into(),
            subtitle: "changed".into(),
            author: "someone".into(),
            content: "*new*".into(),
        };
        let updated = backend
            .update_post(post.id, &replacement.render(Timestamp::from_i64(50)))
            .await
            .unwrap();

        let fetched = backend.post(post.id).await.unwrap().unwrap();
        for p in [&updated, &fetched] {
            assert_eq!(p.id, post.id);
            assert_eq!(p.title, "after");
            assert_eq!(p.subtitle, "changed");
            assert_eq!(p.author, "someone");
            assert_eq!(p.content, "<p><em>new</em></p>\n");
            assert_eq!(p.source, "*new*");
            assert_eq!(p.date_posted, Timestamp::from_i64(50));
        }
    }

    #[tokio::test]
    async fn update_missing_post() {
        let backend = create_backend().await;

        let r = backend
            .update_post(42, &form("ghost").render(Timestamp::from_i64(1)))
            .await;

        assert!(matches!(r, Err(FindError::NotFound)));
        assert!(backend.posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn users() {
        let backend = create_backend().await;

        assert_eq!(backend.user_count().await, Ok(0));
        assert_eq!(
            backend.find_user("admin").await.unwrap_err(),
            FindError::NotFound
        );

        backend.create_user("admin", "hash").await.unwrap();
        assert_eq!(backend.user_count().await, Ok(1));

        let user = backend.find_user("admin").await.unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(user.pwhash, "hash");

        // usernames are unique, and lookups exact
        assert!(backend.create_user("admin", "other").await.is_err());
        assert_eq!(
            backend.find_user("Admin").await.unwrap_err(),
            FindError::NotFound
        );
    }
}
