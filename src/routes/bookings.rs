use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{filters::BoxedFilter, Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, manages_instructor, not_allowed, success, update_reply,
    validation_failure, JsonReply, StatusRequest, BODY_LIMIT,
};
use crate::validation::check_booking;
use db::{
    models::{Booking, BookingStatus, Role},
    Database, Db, DbError, NewBooking, Session,
};
use filters::{authed, authed_is_of_kind, with_db, Authed};

const DEFAULT_STUDENT_NAME: &str = "Student";

#[derive(Deserialize)]
struct BookingQuery {
    /// Admins only
    email: Option<String>,
}

/// Blank contact fields fall back to the session.
#[derive(Deserialize)]
struct BookingRequest {
    instructor_id: String,
    student_name: Option<String>,
    student_email: Option<String>,
    epoch_time: i64,
    pickup_location: Option<String>,
    note: Option<String>,
}

#[derive(Deserialize)]
struct RescheduleRequest {
    epoch_time: i64,
}

#[derive(Serialize)]
struct BookingListResponse<'a> {
    status: &'a str,
    bookings: Vec<&'a Booking>,
}

#[derive(Serialize)]
struct BookingResponse<'a> {
    status: &'a str,
    booking: &'a Booking,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_route = warp::path!("api" / "bookings")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<BookingQuery>())
        .and_then(list)
        .boxed();

    let request_route = warp::path!("api" / "bookings")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Student]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(request)
        .boxed();

    let reschedule_route = warp::path!("api" / "bookings" / String / "reschedule")
        .and(warp::patch())
        .and(authed_is_of_kind(db, &[Role::Student]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(reschedule)
        .boxed();

    let status_route = warp::path!("api" / "bookings" / String / "status")
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(set_status)
        .boxed();

    list_route
        .or(request_route)
        .or(transition_route(db, "approve", BookingStatus::Approved))
        .or(transition_route(db, "reject", BookingStatus::Rejected))
        .or(transition_route(db, "complete", BookingStatus::Completed))
        .or(transition_route(db, "cancel", BookingStatus::Cancelled))
        .or(reschedule_route)
        .or(status_route)
}

/// `PATCH /api/bookings/{id}/{action}`
fn transition_route(
    db: &Db,
    action: &'static str,
    status: BookingStatus,
) -> BoxedFilter<(JsonReply,)> {
    warp::path("api")
        .and(warp::path("bookings"))
        .and(warp::path::param::<String>())
        .and(warp::path(action))
        .and(warp::path::end())
        .and(warp::patch())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and_then(move |id: String, authed: Authed, db: Db| {
            transition(id, authed, db, status)
        })
        .boxed()
}

/// Instructors decide on their own bookings, students may only cancel theirs. Admins do both.
fn may_transition(
    db: &impl Database,
    session: &Session,
    booking: &Booking,
    status: BookingStatus,
) -> bool {
    match (session.role, status) {
        (Role::Admin, _) => true,
        (Role::Student, BookingStatus::Cancelled) => session.is(&booking.student_email),
        (Role::Instructor, BookingStatus::Approved)
        | (Role::Instructor, BookingStatus::Rejected)
        | (Role::Instructor, BookingStatus::Completed) => {
            manages_instructor(db, session, &booking.instructor_id)
        }
        _ => false,
    }
}

async fn list(authed: Authed, db: Db, query: BookingQuery) -> Result<JsonReply, Infallible> {
    let db = db.lock().await;
    let session = &authed.session;

    let bookings = match session.role {
        Role::Student => match query.email.as_deref() {
            Some(email) if !session.is(email) => return Ok(not_allowed()),
            _ => db.booking_list_for_student(&session.email),
        },
        Role::Admin => match query.email.as_deref() {
            Some(email) => db.booking_list_for_student(email),
            None => db.booking_list(),
        },
        Role::Instructor => match db.instructor_for_session(session) {
            Some(instructor) => db.booking_list_for_instructor(&instructor.id),
            None => Vec::new(),
        },
    };

    Ok(success(&BookingListResponse {
        status: "success",
        bookings,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn request(authed: Authed, db: Db, request: BookingRequest) -> Result<JsonReply, Infallible> {
    let session = &authed.session;

    let student_name = non_blank(request.student_name)
        .or_else(|| non_blank(Some(session.name.clone())))
        .unwrap_or_else(|| DEFAULT_STUDENT_NAME.to_string());
    let student_email =
        non_blank(request.student_email).unwrap_or_else(|| session.email.clone());

    if let Err(error) = check_booking(&student_email) {
        return Ok(validation_failure(error));
    }

    let mut db = db.lock().await;

    let booking = NewBooking {
        id: None,
        instructor_id: request.instructor_id,
        student_name,
        student_email,
        epoch_time: request.epoch_time,
        pickup_location: non_blank(request.pickup_location),
        note: non_blank(request.note),
    };

    let booking = match db.booking_request(booking) {
        Ok(booking) => booking.clone(),
        Err(error) => return Ok(db_failure(error)),
    };

    if let Some(session) = db.auth_session_mut(&authed.token) {
        session.request_bookings_tab();
    }

    Ok(success(&BookingResponse {
        status: "success",
        booking: &booking,
    }))
}

async fn transition(
    id: String,
    authed: Authed,
    db: Db,
    status: BookingStatus,
) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    let allowed = match db.booking_get(&id) {
        Some(booking) => may_transition(&*db, &authed.session, booking, status),
        None => return Ok(invalid_id()),
    };

    if !allowed {
        return Ok(not_allowed());
    }

    Ok(update_reply(db.booking_transition(&id, status)))
}

/// Moving a lesson sends it back for approval, which only makes sense while it is still open.
async fn reschedule(
    id: String,
    authed: Authed,
    db: Db,
    request: RescheduleRequest,
) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    let booking = match db.booking_get(&id) {
        Some(booking) => booking,
        None => return Ok(invalid_id()),
    };

    if !authed.session.is(&booking.student_email) {
        return Ok(not_allowed());
    }

    if !booking.is_open() {
        return Ok(db_failure(DbError::InvalidTransition {
            kind: "booking",
            id,
            from: booking.status.as_str(),
            to: BookingStatus::Requested.as_str(),
        }));
    }

    Ok(update_reply(db.booking_reschedule(&id, request.epoch_time)))
}

async fn set_status(
    id: String,
    _authed: Authed,
    db: Db,
    request: StatusRequest,
) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;
    Ok(update_reply(db.booking_set_status(&id, &request.status)))
}
