use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, not_allowed, success, JsonReply, SimpleSuccessResponse, BODY_LIMIT,
};
use db::{
    models::{Role, Student},
    Database, Db, Session,
};
use filters::{authed, decoded_param, with_db, Authed};

#[derive(Deserialize)]
struct ProfileRequest {
    name: String,
    phone: String,
    address: String,
}

#[derive(Serialize)]
struct StudentResponse<'a> {
    status: &'a str,
    student: &'a Student,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // Clients may escape the `@` of the email
    let student_path = || {
        warp::path("api")
            .and(warp::path("students"))
            .and(decoded_param())
            .and(warp::path::end())
    };

    let get_route = student_path()
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    let save_route = student_path()
        .and(warp::put())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(save)
        .boxed();

    get_route.or(save_route)
}

fn may_access(session: &Session, email: &str) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Student => session.is(email),
        Role::Instructor => false,
    }
}

async fn get(email: String, authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    if !may_access(&authed.session, &email) {
        return Ok(not_allowed());
    }

    let db = db.lock().await;

    match db.student_get(&email) {
        Some(student) => Ok(success(&StudentResponse {
            status: "success",
            student,
        })),
        None => Ok(invalid_id()),
    }
}

/// Saves the whole profile, and refreshes the session when students edit their own.
async fn save(
    email: String,
    authed: Authed,
    db: Db,
    request: ProfileRequest,
) -> Result<JsonReply, Infallible> {
    if !may_access(&authed.session, &email) {
        return Ok(not_allowed());
    }

    let mut db = db.lock().await;

    let student = Student {
        email: email.clone(),
        name: request.name.trim().to_string(),
        phone: request.phone.trim().to_string(),
        address: request.address.trim().to_string(),
    };

    if let Err(error) = db.student_upsert(student.clone()) {
        return Ok(db_failure(error));
    }

    if let Some(session) = db.auth_session_mut(&authed.token) {
        if session.role == Role::Student && session.is(&email) {
            session.set_student_profile(
                &student.name,
                &student.email,
                &student.phone,
                &student.address,
            );
        }
    }

    Ok(success(&SimpleSuccessResponse::new()))
}
