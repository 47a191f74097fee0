use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, LevelFilter};
use warp::Filter;

mod args;
use args::Args;

mod auth;
mod backend;
mod blog;
mod markdown;
mod post;
mod routes;
mod session;
mod templates;
mod time;
mod user;

use backend::Backend;
use blog::Blog;
use session::Sessions;
use templates::Pages;

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("INKPOT_LOG")
        .init();

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid address: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sessions = match Sessions::new(args.secret_key(), args.secure()) {
        Ok(sessions) => sessions,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let pages = match Pages::new() {
        Ok(pages) => pages,
        Err(e) => {
            error!("couldn't load templates: {e:?}");
            return ExitCode::FAILURE;
        }
    };

    let backend = match Backend::new(args.data_dir()).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("couldn't open database in {}: {e}", args.data_dir().display());
            return ExitCode::FAILURE;
        }
    };

    let blog = Arc::new(Blog::new(backend, sessions, pages));

    let (admin_user, admin_password) = args.admin();
    if blog.seed_user(admin_user, admin_password).await.is_err() {
        error!("couldn't create initial user {admin_user}");
        return ExitCode::FAILURE;
    }

    let routes = routes::routes(blog).with(warp::log("inkpot::http"));

    info!("listening on {addr}");
    warp::serve(routes).run(addr).await;

    ExitCode::SUCCESS
}
