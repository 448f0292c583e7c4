/// HTTP server exposing view computation as JSON endpoints
use actix_web::{middleware, web, App, HttpResponse, HttpServer};

use crate::error::ViewError;
use crate::field::FieldType;
use crate::messages::{Capabilities, ComputeRequest, ErrorResponse, ParseRequest, ParseResponse};
use crate::query::parse_filter;
use crate::view::compute_view;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Read `HOST` and `PORT` from the environment.
    pub fn from_env() -> Result<Self, ViewError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with a custom variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ViewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ViewError::Config(format!("PORT must be a number, got '{}'", raw)))?,
            None => DEFAULT_PORT,
        };
        Ok(ServerConfig { host, port })
    }
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "dbview server is running"
    }))
}

async fn compute(req: web::Json<ComputeRequest>) -> HttpResponse {
    let req = req.into_inner();
    let view = compute_view(&req.rows, &req.fields, &req.config, &req.context);
    HttpResponse::Ok().json(&view)
}

async fn parse(req: web::Json<ParseRequest>) -> HttpResponse {
    match parse_filter(&req.query, &req.fields) {
        Ok(filter) => HttpResponse::Ok().json(ParseResponse {
            rule_count: filter.rule_count(),
            filter,
        }),
        Err(err) => {
            log::debug!("rejected filter query: {}", err);
            HttpResponse::BadRequest().json(ErrorResponse::from(&err))
        }
    }
}

async fn capabilities(path: web::Path<String>) -> HttpResponse {
    let name = path.into_inner();
    match serde_json::from_value::<FieldType>(serde_json::Value::String(name.clone())) {
        Ok(field_type) => HttpResponse::Ok().json(Capabilities::of(field_type)),
        Err(_) => HttpResponse::NotFound().json(ErrorResponse::new(format!("unknown field type '{}'", name))),
    }
}

/// Register every route on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/views/compute", web::post().to(compute))
        .route("/filters/parse", web::post().to(parse))
        .route("/fields/{field_type}/capabilities", web::get().to(capabilities));
}

/// Start the HTTP server
pub async fn run_server(config: &ServerConfig) -> std::io::Result<()> {
    log::info!("dbview server listening on http://{}:{}", config.host, config.port);
    log::info!("health check: http://{}:{}/health", config.host, config.port);

    HttpServer::new(|| {
        App::new()
            // Enable logger
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
