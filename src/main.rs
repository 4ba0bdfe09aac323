use std::io;

use actix_web::{web, App, HttpServer};
use env_logger::Builder;
use log::info;

use twitter_api::config::Config;
use twitter_api::handlers;
use twitter_api::services::Services;
use twitter_api::store::JsonFileStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config =
        Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    Builder::new()
        .filter_level(config.log_level)
        .format_timestamp_secs()
        .init();

    info!("Starting Twitter API backend...");
    let store = JsonFileStore::new(&config.data_dir, config.lock_timeout);
    let services = Services::open(&store, config.bcrypt_cost)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let services = web::Data::new(services);

    info!("Collections ready in {}", store.data_dir().display());

    HttpServer::new(move || {
        App::new()
            .app_data(services.clone())
            .configure(handlers::configure)
    })
    .workers(config.workers)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
