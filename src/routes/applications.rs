use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use super::globals::{db_failure, success, update_reply, JsonReply, BODY_LIMIT};
use db::{
    models::{Application, ApplicationStatus, Instructor, Role},
    Database, Db, NewApplication,
};
use filters::{authed_is_of_kind, with_db, Authed};

#[derive(Deserialize)]
struct ApplicationQuery {
    status: Option<String>,
}

/// Name and email always come from the session.
#[derive(Deserialize)]
struct ApplicationRequest {
    id: Option<String>,
    address: Option<String>,
    city: Option<String>,
    price_per_hour: Option<u32>,
    car_type: Option<String>,
    languages: Option<String>,
}

#[derive(Serialize)]
struct ApplicationListResponse<'a> {
    status: &'a str,
    applications: Vec<&'a Application>,
}

#[derive(Serialize)]
struct ApplicationResponse<'a> {
    status: &'a str,
    application: Option<&'a Application>,
    /// Present once the application is approved
    instructor: Option<&'a Instructor>,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "applications")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and(warp::query::<ApplicationQuery>())
        .and_then(list)
        .boxed();

    let submit_route = warp::path!("api" / "applications")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Instructor]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(submit)
        .boxed();

    let mine_route = warp::path!("api" / "applications" / "mine")
        .and(warp::get())
        .and(authed_is_of_kind(db, &[Role::Instructor]))
        .and(with_db(db.clone()))
        .and_then(mine)
        .boxed();

    let approve_route = warp::path!("api" / "applications" / String / "approve")
        .and(warp::patch())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and_then(approve)
        .boxed();

    let reject_route = warp::path!("api" / "applications" / String / "reject")
        .and(warp::patch())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and_then(reject)
        .boxed();

    list_route
        .or(submit_route)
        .or(mine_route)
        .or(approve_route)
        .or(reject_route)
}

async fn list(_authed: Authed, db: Db, query: ApplicationQuery) -> Result<JsonReply, Infallible> {
    let status = match query.status.as_deref().map(str::parse::<ApplicationStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(error)) => return Ok(db_failure(error)),
        None => None,
    };

    let db = db.lock().await;

    Ok(success(&ApplicationListResponse {
        status: "success",
        applications: db.application_list(status),
    }))
}

async fn submit(
    authed: Authed,
    db: Db,
    request: ApplicationRequest,
) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    // Without an id the applicant edits the application they already have
    let id = request.id.or_else(|| {
        db.application_for_email(&authed.session.email)
            .map(|application| application.id.clone())
    });

    let application = NewApplication {
        id,
        instructor_name: authed.session.name,
        email: authed.session.email,
        address: request.address,
        city: request.city,
        price_per_hour: request.price_per_hour,
        car_type: request.car_type,
        languages: request.languages,
    };

    match db.application_submit(application) {
        Ok(application) => Ok(success(&ApplicationResponse {
            status: "success",
            application: Some(application),
            instructor: None,
        })),
        Err(error) => Ok(db_failure(error)),
    }
}

async fn mine(authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let db = db.lock().await;

    Ok(success(&ApplicationResponse {
        status: "success",
        application: db.application_for_email(&authed.session.email),
        instructor: db.instructor_for_session(&authed.session),
    }))
}

async fn approve(id: String, _authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;
    Ok(update_reply(db.application_approve(&id)))
}

async fn reject(id: String, _authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;
    Ok(update_reply(db.application_reject(&id)))
}
