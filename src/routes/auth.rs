use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use super::globals::{
    db_failure, not_allowed, success, validation_failure, ErrorCode, FailureResponse, JsonReply,
    SimpleSuccessResponse, BODY_LIMIT,
};
use crate::validation::{check_login, check_registration, Registration};
use db::{
    models::{Role, Student},
    Database, Db, NewApplication, Session,
};
use filters::{authed, with_db, Authed};

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    role: Role,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    status: &'a str,
    token: &'a str,
    session: &'a Session,
}

#[derive(Serialize)]
struct SessionResponse<'a> {
    status: &'a str,
    session: &'a Session,
    /// Set once after a booking request, then cleared
    show_bookings_tab: bool,
}

#[derive(Serialize)]
struct RegisterResponse<'a> {
    status: &'a str,
    token: &'a str,
    session: &'a Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_id: Option<String>,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let post_session_route = warp::path!("api" / "session")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and(with_db(db.clone()))
        .and_then(post_session)
        .boxed();

    let get_session_route = warp::path!("api" / "session")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(get_session)
        .boxed();

    let delete_session_route = warp::path!("api" / "session")
        .and(warp::delete())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(delete_session)
        .boxed();

    let register_route = warp::path!("api" / "register")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and(with_db(db.clone()))
        .and_then(register)
        .boxed();

    post_session_route
        .or(get_session_route)
        .or(delete_session_route)
        .or(register_route)
}

/// Any well-formed email and long enough password is accepted: there are no stored credentials.
async fn post_session(request: LoginRequest, db: Db) -> Result<JsonReply, Infallible> {
    if let Err(error) = check_login(&request.email, &request.password) {
        return Ok(validation_failure(error));
    }

    let mut db = db.lock().await;
    let (session, token) = db.auth_login(request.email.trim(), request.role);

    Ok(success(&LoginResponse {
        status: "success",
        token: &token,
        session,
    }))
}

async fn get_session(authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    let show_bookings_tab = db
        .auth_session_mut(&authed.token)
        .map(|session| session.take_show_bookings_tab())
        .unwrap_or(false);

    Ok(success(&SessionResponse {
        status: "success",
        session: &authed.session,
        show_bookings_tab,
    }))
}

async fn delete_session(authed: Authed, db: Db) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    if db.auth_logout(&authed.token) {
        Ok(success(&SimpleSuccessResponse::new()))
    } else {
        Ok(warp::reply::with_status(
            FailureResponse::new_reply(ErrorCode::InvalidCredentials),
            warp::http::StatusCode::FORBIDDEN,
        ))
    }
}

/// Students get a profile right away, instructors get a pending application. Either way the
/// new account is signed in.
async fn register(request: Registration, db: Db) -> Result<JsonReply, Infallible> {
    if let Err(error) = check_registration(&request) {
        return Ok(validation_failure(error));
    }

    let mut db = db.lock().await;
    let email = request.email.trim().to_string();
    let name = request.name.trim().to_string();

    let application_id = match request.role {
        Role::Student => {
            let student = Student {
                email: email.clone(),
                name,
                phone: request.phone.clone().unwrap_or_default(),
                address: request.address.clone().unwrap_or_default(),
            };

            match db.student_upsert(student) {
                Ok(()) => None,
                Err(error) => return Ok(db_failure(error)),
            }
        }
        Role::Instructor => {
            let application = NewApplication {
                id: None,
                instructor_name: name,
                email: email.clone(),
                price_per_hour: request.price(),
                address: request.address,
                city: request.city,
                car_type: request.car_type,
                languages: request.languages,
            };

            match db.application_submit(application) {
                Ok(application) => Some(application.id.clone()),
                Err(error) => return Ok(db_failure(error)),
            }
        }
        Role::Admin => return Ok(not_allowed()),
    };

    let (session, token) = db.auth_login(&email, request.role);

    Ok(success(&RegisterResponse {
        status: "success",
        token: &token,
        session,
        application_id,
    }))
}
