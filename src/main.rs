use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};

use exam_engine_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    config.validate().map_err(std::io::Error::other)?;

    let bind_address = (config.web_server_host.clone(), config.web_server_port);
    let state = Arc::new(AppState::new(config).await.map_err(std::io::Error::other)?);

    log::info!(
        "Starting HTTP server on {}:{}",
        bind_address.0,
        bind_address.1
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}
