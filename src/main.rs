use log::{error, info};
use warp::Filter;

mod config;
mod routes;
mod validation;

use db::new_db;
use routes::{handle_rejection, routes};

#[tokio::main]
async fn main() {
    let config = match config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Could not load the configuration: {}", err);
            return;
        }
    };

    if let Err(err) = config::setup_logging(&config) {
        eprintln!("Could not apply logging configuration: {}", err);
        return;
    }

    let global_db = match new_db(config.database.clone(), config.seed_fixtures) {
        Ok(db) => db,
        Err(err) => {
            error!("Could not open {}: {}", config.database, err);
            return;
        }
    };
    let filters = routes(&global_db);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allow_headers(vec!["content-type", "Authorization"]);

    let filters = filters
        .with(cors)
        // Before logging for correct status codes
        .recover(handle_rejection)
        .with(warp::log("drivetree"));

    info!("listening on {}:{}", config.address, config.port);
    warp::serve(filters).run((config.address, config.port)).await;
}
