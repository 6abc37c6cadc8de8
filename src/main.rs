use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

use crate::config::{AllowedOrigins, Config};
use crate::expense_client::{DynExpenseSource, HttpExpenseSource};

mod config;
mod error;
mod expense_client;
mod logs;
mod routes;
mod schemas;
mod summary;

fn cors_for(origins: &AllowedOrigins) -> Cors {
    let cors = match origins {
        AllowedOrigins::Any => Cors::default().allow_any_origin(),
        AllowedOrigins::List(list) => list
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
    };
    cors.allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logs::init_tracing();

    let config = Config::init()?;
    info!(
        upstream = %config.expense_service.base_url,
        timeout = ?config.expense_service.timeout,
        max_retries = config.expense_service.max_retries,
        "using expense service"
    );

    let source: DynExpenseSource = Arc::new(
        HttpExpenseSource::new(config.expense_service.clone())
            .context("failed to build expense service client")?,
    );

    let origins = config.cors_allowed_origins.clone();
    info!(host = %config.host, port = config.port, "starting analytics server");

    HttpServer::new(move || {
        App::new()
            .wrap(cors_for(&origins))
            .app_data(web::Data::new(source.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("analytics server stopped with an error")
}
