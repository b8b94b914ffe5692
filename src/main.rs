#[macro_use]
extern crate lazy_static;

use std::collections::HashMap;

use actix_files::{Files, NamedFile};
use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    http::{Method, StatusCode},
    middleware,
    web::{self, Data},
    App, Either, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use log::info;
use sqlx::SqlitePool;
use tera::{Tera, Value};

mod auth;
mod cli;
mod config;
mod db;
mod documents;
mod errors;
mod forms;
mod money;
mod pdf;
mod report;
mod routes;
mod structs;
mod utils;

use cli::{Cli, Commands};
use config::Config;
use errors::AppError;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub agency_name: String,
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
        tera.register_filter("month_name", month_name_filter);
        tera
    };
}

/// `{{ 3 | month_name }}` renders `Mars`.
fn month_name_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = value
        .as_u64()
        .and_then(|m| u32::try_from(m).ok())
        .and_then(report::month_name)
        .ok_or_else(|| tera::Error::msg(format!("month_name: invalid month {}", value)))?;
    Ok(Value::String(name.to_owned()))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await?,
        Commands::CreateAdmin { username, password } => {
            cli::run_create_admin(&config, username, password).await?
        }
    }
    Ok(())
}

async fn serve(config: Config) -> Result<(), AppError> {
    let session_key = config::session_key()?;
    let db_pool = config::connect(&config.database_url).await?;

    let state = AppState {
        db_pool,
        agency_name: config.agency_name.clone(),
    };
    if db::count_admins(&state).await? == 0 {
        log::warn!("No admin account yet, run `locative create-admin` to create one");
    }
    let secure_cookies = config.secure_cookies;

    info!(
        "Starting HTTP server on http://{}:{}/",
        config.host, config.port
    );

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(secure_cookies)
                    .build(),
            )
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .default_service(web::to(default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
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
