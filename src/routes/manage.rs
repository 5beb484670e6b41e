use db::{models::Role, Database, Db};
use filters::{authed_is_of_kind, with_db, Authed};
use serde::Serialize;
use std::convert::Infallible;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::globals::{db_failure, success, ErrorCode, FailureResponse, JsonReply};

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index_route = warp::get()
        .and(warp::path::end())
        .and_then(index)
        .boxed();

    let dump_route = warp::path!("api" / "dump")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and_then(dump)
        .boxed();

    let reset_route = warp::path!("api" / "reset")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and_then(reset)
        .boxed();

    index_route.or(dump_route).or(reset_route)
}

#[derive(Serialize)]
struct IndexResponse {
    status: &'static str,
    name: &'static str,
    version: &'static str,
}

async fn index() -> Result<JsonReply, Infallible> {
    Ok(success(&IndexResponse {
        status: "success",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn dump(_authed: Authed, db: Db) -> Result<impl warp::Reply, Infallible> {
    let db = db.lock().await;

    let reply = match db.dump_as_json() {
        Ok(json) => warp::reply::with_status(
            warp::reply::with_header(json, "content-type", "application/json"),
            StatusCode::OK,
        ),
        Err(error) => {
            log::error!("could not dump the database: {}", error);
            let json = serde_json::to_string(&FailureResponse::new(ErrorCode::InternalServerError))
                .unwrap_or_default();
            warp::reply::with_status(
                warp::reply::with_header(json, "content-type", "application/json"),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    Ok(reply)
}

// Resets the database
async fn reset(_authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    match db.reset() {
        Ok(()) => Ok(success(&"ok".to_string())),
        Err(error) => Ok(db_failure(error)),
    }
}
