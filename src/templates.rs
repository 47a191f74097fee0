use log::error;
use tera::{Context, Tera};

use crate::blog::{Error, Result};
use crate::post::{Post, PostForm};
use crate::session::Session;

/// The site's html, embedded at build time.
pub struct Pages {
    tera: Tera,
}

impl Pages {
    pub fn new() -> std::result::Result<Self, tera::Error> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("index.html", include_str!("../templates/index.html")),
            ("about.html", include_str!("../templates/about.html")),
            ("post.html", include_str!("../templates/post.html")),
            ("login.html", include_str!("../templates/login.html")),
            ("add.html", include_str!("../templates/add.html")),
            ("edit.html", include_str!("../templates/edit.html")),
            ("error.html", include_str!("../templates/error.html")),
        ])?;

        Ok(Self { tera })
    }

    fn render(&self, name: &str, session: Session, context: &mut Context) -> Result<String> {
        context.insert("logged_in", &session.logged_in);

        self.tera.render(name, context).map_err(|e| {
            error!("couldn't render {name}: {e:?}");
            Error::Internal
        })
    }

    pub fn index(&self, session: Session, posts: &[Post]) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", posts);
        self.render("index.html", session, &mut context)
    }

    pub fn about(&self, session: Session) -> Result<String> {
        self.render("about.html", session, &mut Context::new())
    }

    pub fn post(&self, session: Session, post: &Post) -> Result<String> {
        let mut context = Context::new();
        context.insert("post", post);
        self.render("post.html", session, &mut context)
    }

    pub fn login(&self, session: Session, error: Option<&str>) -> Result<String> {
        let mut context = Context::new();
        context.insert("error", &error);
        self.render("login.html", session, &mut context)
    }

    pub fn add(&self, session: Session, form: &PostForm, error: Option<&str>) -> Result<String> {
        let mut context = Context::new();
        context.insert("form", form);
        context.insert("error", &error);
        self.render("add.html", session, &mut context)
    }

    pub fn edit(
        &self,
        session: Session,
        id: i64,
        form: &PostForm,
        error: Option<&str>,
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("id", &id);
        context.insert("form", form);
        context.insert("error", &error);
        self.render("edit.html", session, &mut context)
    }

    pub fn error(&self, session: Session, message: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("error", message);
        self.render("error.html", session, &mut context)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::Timestamp;

    fn post() -> Post {
        Post {
            id: 3,
            title: "A <title>".into(),
            subtitle: "sub".into(),
            author: "rob".into(),
            date_posted: Timestamp::from_i64(1_700_000_000),
            content: "<p><em>hi</em></p>\n".into(),
            source: "*hi*".into(),
        }
    }

    #[test]
    fn post_page_escapes_fields_but_not_content() {
        let pages = Pages::new().unwrap();
        let html = pages.post(Session::default(), &post()).unwrap();

        assert!(html.contains("A &lt;title&gt;"), "{html}");
        assert!(html.contains("<p><em>hi</em></p>"), "{html}");
        assert!(html.contains("November 14, 2023"), "{html}");
    }

    #[test]
    fn nav_follows_session() {
        let pages = Pages::new().unwrap();

        let anon = pages.about(Session::default()).unwrap();
        assert!(anon.contains("href=\"/login\""), "{anon}");
        assert!(!anon.contains("href=\"/logout\""), "{anon}");

        let authed = pages.about(Session { logged_in: true }).unwrap();
        assert!(authed.contains("href=\"/logout\""), "{authed}");
        assert!(authed.contains("href=\"/addpost\""), "{authed}");
    }

    #[test]
    fn index_links_every_post() {
        let pages = Pages::new().unwrap();

        let empty = pages.index(Session::default(), &[]).unwrap();
        assert!(empty.contains("No posts yet"), "{empty}");

        let html = pages.index(Session::default(), &[post()]).unwrap();
        assert!(html.contains("href=\"/post/3\""), "{html}");
    }

    #[test]
    fn edit_form_is_prefilled() {
        let pages = Pages::new().unwrap();
        let form = PostForm::from(&post());

        let html = pages
            .edit(Session { logged_in: true }, 3, &form, Some("Title must be at most 50 characters"))
            .unwrap();

        assert!(html.contains("action=\"/editpost/3\""), "{html}");
        assert!(html.contains("*hi*"), "{html}");
        assert!(html.contains("Title must be at most 50 characters"), "{html}");
    }
}
