#[macro_use]
extern crate lazy_static;
use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};

use std::{env, str::FromStr};
use tera::Tera;

use actix_files::{Files, NamedFile};
use actix_web::{
    cookie::Key,
    http::{Method, StatusCode},
    middleware,
    web::{self, Data},
    App, Either, HttpResponse, HttpServer, Responder,
};
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

mod db;
mod errors;
mod forms;
mod items;
mod mailer;
mod pdf;
mod routes;
mod structs;
mod utils;

use mailer::Mailer;
use structs::Features;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub mailer: Option<Mailer>,
    pub features: Features,
}

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = match Tera::new("templates/**/*") {
            Ok(t) => t,
            Err(e) => {
                log::error!("Parsing error(s): {}", e);
                ::std::process::exit(1);
            }
        };
        tera.autoescape_on(vec![".html"]);
        tera
    };
}

fn get_session_key() -> Key {
    let key_str = env::var("SESSION_KEY").unwrap_or_else(|_| {
        log::error!("FATAL: SESSION_KEY environment variable not set");
        std::process::exit(1);
    });
    Key::from(key_str.as_bytes())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quittung.db".to_owned());

    let opts = SqliteConnectOptions::from_str(&database_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(std::time::Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    info!("Database migrated successfully");

    let smtp = Mailer::from_env();
    if smtp.is_none() {
        info!("SMTP not configured, email delivery disabled");
    }
    let features = Features::new(smtp.is_some());

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    info!("Starting HTTP server on http://localhost:{}/", port);

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                get_session_key(),
            ))
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .service(routes::index_handler)
            .service(routes::home_handler)
            .service(routes::login_handler)
            .service(routes::login_form_handler)
            .service(routes::register_handler)
            .service(routes::register_form_handler)
            .service(routes::logout_handler)
            .service(routes::generate_handler)
            .service(routes::download_pdf_handler)
            .service(routes::view_receipt_handler)
            .service(routes::receipt_pdf_handler)
            .service(routes::send_email_handler)
            .service(routes::send_email_form_handler)
            .service(routes::recent_receipts_handler)
            .service(routes::history_handler)
            .service(routes::settings_handler)
            .service(routes::settings_form_handler)
            .app_data(Data::new(AppState {
                db_pool: db_pool.clone(),
                mailer: smtp.clone(),
                features: features.clone(),
            }))
            .default_service(web::to(default_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn default_handler(req_method: Method) -> Result<impl Responder, std::io::Error> {
    match req_method {
        Method::GET => {
            let file = NamedFile::open("static/404.html")?
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(file))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}
