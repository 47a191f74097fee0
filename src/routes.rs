use std::future::Future;
use std::sync::Arc;

use log::error;
use serde::{de::DeserializeOwned, Deserialize};
use warp::http::{StatusCode, Uri};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::blog::{Blog, Error, Result};
use crate::post::PostForm;
use crate::session::{Session, SessionToken, COOKIE_NAME};

const FORM_LIMIT: u64 = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

pub fn routes(blog: Arc<Blog>) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let blog = warp::any().map(move || Arc::clone(&blog));
    let session = || warp::cookie::optional::<String>(COOKIE_NAME);

    let index = warp::path::end()
        .and(warp::get())
        .and(blog.clone())
        .and(session())
        .then(index);

    let about = warp::path!("about")
        .and(warp::get())
        .and(blog.clone())
        .and(session())
        .then(about);

    let post = warp::path!("post" / i64)
        .and(warp::get())
        .and(blog.clone())
        .and(session())
        .then(show_post);

    let login = {
        let page = warp::path!("login")
            .and(warp::get())
            .and(blog.clone())
            .and(session())
            .then(login_page);

        let submit = warp::path!("login")
            .and(warp::post())
            .and(blog.clone())
            .and(form())
            .then(login);

        page.or(submit).unify()
    };

    let logout = warp::path!("logout")
        .and(warp::get())
        .and(blog.clone())
        .then(logout);

    let add = {
        let page = warp::path!("addpost")
            .and(warp::get())
            .and(blog.clone())
            .and(session())
            .then(add_page);

        let submit = warp::path!("addpost")
            .and(warp::post())
            .and(blog.clone())
            .and(session())
            .and(form())
            .then(add_post);

        page.or(submit).unify()
    };

    let edit = {
        let page = warp::path!("editpost" / i64)
            .and(warp::get())
            .and(blog.clone())
            .and(session())
            .then(edit_page);

        let submit = warp::path!("editpost" / i64)
            .and(warp::post())
            .and(blog.clone())
            .and(session())
            .and(form())
            .then(edit_post);

        page.or(submit).unify()
    };

    let delete = warp::path!("delete" / i64)
        .and(warp::get())
        .and(blog)
        .and(session())
        .then(delete_post);

    index
        .or(about)
        .unify()
        .or(post)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .or(add)
        .unify()
        .or(edit)
        .unify()
        .or(delete)
        .unify()
}

fn form<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form())
}

fn html(body: String) -> Response {
    warp::reply::html(body).into_response()
}

fn redirect(to: &'static str) -> Response {
    warp::redirect::see_other(Uri::from_static(to)).into_response()
}

fn with_cookie(reply: Response, token: &SessionToken) -> Response {
    warp::reply::with_header(reply, "set-cookie", token.to_string()).into_response()
}

/// Turn a handler's outcome into a response: anonymous access to a gated
/// route goes to the login form, everything else gets an error page.
async fn respond<F>(blog: &Blog, session: Session, handler: F) -> Response
where
    F: Future<Output = Result<Response>>,
{
    let e = match handler.await {
        Ok(response) => return response,
        Err(Error::Unauthorized) => return redirect("/login"),
        Err(e) => e,
    };

    let status: StatusCode = e.into();
    match blog.pages().error(session, &e.to_string()) {
        Ok(body) => warp::reply::with_status(html(body), status).into_response(),
        Err(_) => {
            error!("couldn't render error page for {e:?}");
            status.into_response()
        }
    }
}

async fn index(blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        let posts = blog.posts().await?;
        blog.pages().index(session, &posts).map(html)
    })
    .await
}

async fn about(blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async { blog.pages().about(session).map(html) }).await
}

async fn show_post(id: i64, blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        let post = blog.post(id).await?;
        blog.pages().post(session, &post).map(html)
    })
    .await
}

async fn login_page(blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        blog.pages().login(session, None).map(html)
    })
    .await
}

async fn login(blog: Arc<Blog>, form: LoginForm) -> Response {
    let session = Session::default();

    respond(&blog, session, async {
        match blog.login(&form.username, &form.password).await {
            Ok(token) => Ok(with_cookie(redirect("/addpost"), &token)),
            Err(Error::Unauthorized) => {
                let message = Error::Unauthorized.to_string();
                blog.pages().login(session, Some(message.as_str())).map(html)
            }
            Err(e) => Err(e),
        }
    })
    .await
}

async fn logout(blog: Arc<Blog>) -> Response {
    with_cookie(redirect("/"), &blog.logout())
}

async fn add_page(blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        blog.authenticate(cookie.as_deref())?;
        blog.pages()
            .add(session, &PostForm::default(), None)
            .map(html)
    })
    .await
}

async fn add_post(blog: Arc<Blog>, cookie: Option<String>, form: PostForm) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        let authed = blog.authenticate(cookie.as_deref())?;

        match authed.create_post(&form).await {
            Ok(_) => Ok(redirect("/")),
            Err(Error::Invalid(msg)) => blog.pages().add(session, &form, Some(msg)).map(html),
            Err(e) => Err(e),
        }
    })
    .await
}

async fn edit_page(id: i64, blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        blog.authenticate(cookie.as_deref())?;

        let post = blog.post(id).await?;
        blog.pages()
            .edit(session, id, &PostForm::from(&post), None)
            .map(html)
    })
    .await
}

async fn edit_post(id: i64, blog: Arc<Blog>, cookie: Option<String>, form: PostForm) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        let authed = blog.authenticate(cookie.as_deref())?;

        match authed.update_post(id, &form).await {
            Ok(_) => Ok(redirect("/")),
            Err(Error::Invalid(msg)) => blog.pages().edit(session, id, &form, Some(msg)).map(html),
            Err(e) => Err(e),
        }
    })
    .await
}

async fn delete_post(id: i64, blog: Arc<Blog>, cookie: Option<String>) -> Response {
    let session = blog.session(cookie.as_deref());

    respond(&blog, session, async {
        let authed = blog.authenticate(cookie.as_deref())?;
        authed.delete_post(id).await?;
        Ok(redirect("/"))
    })
    .await
}
