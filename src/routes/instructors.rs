use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use super::globals::{
    db_failure, invalid_id, manages_instructor, not_allowed, success, update_reply, JsonReply,
    SimpleSuccessResponse, StatusRequest, BODY_LIMIT,
};
use db::{
    models::{Booking, Instructor, InstructorStatus, Role},
    Database, Db, InstructorUpdate, SearchQuery,
};
use filters::{authed, authed_is_of_kind, with_db, Authed, Malformed};

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Serialize)]
struct InstructorListResponse<'a> {
    status: &'a str,
    total: usize,
    instructors: Vec<&'a Instructor>,
}

#[derive(Serialize)]
struct InstructorResponse<'a> {
    status: &'a str,
    instructor: &'a Instructor,
}

#[derive(Serialize)]
struct BookingListResponse<'a> {
    status: &'a str,
    bookings: Vec<&'a Booking>,
}

#[derive(Deserialize)]
struct ScheduleQuery {
    /// "YYYY-MM-DD", read as a UTC day
    day: Option<String>,
}

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let search_route = warp::path!("api" / "instructors")
        .and(warp::get())
        .and(warp::query::<SearchQuery>())
        .and(with_db(db.clone()))
        .and_then(search)
        .boxed();

    let upsert_route = warp::path!("api" / "instructors")
        .and(warp::post())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(upsert)
        .boxed();

    let get_route = warp::path!("api" / "instructors" / String)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(get)
        .boxed();

    let update_route = warp::path!("api" / "instructors" / String)
        .and(warp::patch())
        .and(authed_is_of_kind(db, &[Role::Admin, Role::Instructor]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(update)
        .boxed();

    let status_route = warp::path!("api" / "instructors" / String / "status")
        .and(warp::put())
        .and(authed_is_of_kind(db, &[Role::Admin]))
        .and(with_db(db.clone()))
        .and(warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json()))
        .and_then(set_status)
        .boxed();

    let bookings_route = warp::path!("api" / "instructors" / String / "bookings")
        .and(warp::get())
        .and(authed(db))
        .and(with_db(db.clone()))
        .and(warp::query::<ScheduleQuery>())
        .and_then(bookings)
        .boxed();

    search_route
        .or(upsert_route)
        .or(get_route)
        .or(update_route)
        .or(status_route)
        .or(bookings_route)
}

async fn search(query: SearchQuery, db: Db) -> Result<JsonReply, Infallible> {
    let db = db.lock().await;
    let instructors = db.instructor_search(&query);

    Ok(success(&InstructorListResponse {
        status: "success",
        total: instructors.len(),
        instructors,
    }))
}

async fn upsert(_authed: Authed, db: Db, instructor: Instructor) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    match db.instructor_upsert(instructor) {
        Ok(()) => Ok(success(&SimpleSuccessResponse::new())),
        Err(error) => Ok(db_failure(error)),
    }
}

async fn get(id: String, db: Db) -> Result<JsonReply, Infallible> {
    let db = db.lock().await;

    match db.instructor_get(&id) {
        Some(instructor) => Ok(success(&InstructorResponse {
            status: "success",
            instructor,
        })),
        None => Ok(invalid_id()),
    }
}

async fn update(
    id: String,
    authed: Authed,
    db: Db,
    update: InstructorUpdate,
) -> Result<JsonReply, Infallible> {
    let mut db = db.lock().await;

    if !manages_instructor(&*db, &authed.session, &id) {
        return Ok(not_allowed());
    }

    Ok(update_reply(db.instructor_update(&id, update)))
}

async fn set_status(
    id: String,
    _authed: Authed,
    db: Db,
    request: StatusRequest,
) -> Result<JsonReply, Infallible> {
    let status: InstructorStatus = match request.status.parse() {
        Ok(status) => status,
        Err(error) => return Ok(db_failure(error)),
    };

    let mut db = db.lock().await;
    Ok(update_reply(db.instructor_set_status(&id, status)))
}

/// Lists the bookings of an instructor, or the open ones of a single day when `day` is given.
async fn bookings(
    id: String,
    authed: Authed,
    db: Db,
    query: ScheduleQuery,
) -> Result<JsonReply, Rejection> {
    let window = match query.day.as_deref() {
        Some(day) => Some(day_window(day).ok_or_else(|| warp::reject::custom(Malformed))?),
        None => None,
    };

    let db = db.lock().await;

    if db.instructor_get(&id).is_none() {
        return Ok(invalid_id());
    }
    if !manages_instructor(&*db, &authed.session, &id) {
        return Ok(not_allowed());
    }

    let bookings = match window {
        Some((from, to)) => db.booking_schedule(&id, from, to),
        None => db.booking_list_for_instructor(&id),
    };

    Ok(success(&BookingListResponse {
        status: "success",
        bookings,
    }))
}

/// Start and end of a UTC day, in milliseconds since the epoch.
fn day_window(day: &str) -> Option<(i64, i64)> {
    let start = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?
        .and_utc()
        .timestamp_millis();

    Some((start, start + DAY_MILLIS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_are_utc_windows() {
        let (from, to) = day_window("2024-05-01").unwrap();

        assert_eq!(from, 1_714_521_600_000);
        assert_eq!(to - from, DAY_MILLIS);
        assert_eq!(day_window(" 2024-05-01 "), Some((from, to)));
    }

    #[test]
    fn malformed_days_are_refused() {
        assert_eq!(day_window("01/05/2024"), None);
        assert_eq!(day_window("2024-02-30"), None);
        assert_eq!(day_window(""), None);
    }
}
