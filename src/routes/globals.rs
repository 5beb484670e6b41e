use db::{models::Role, Database, DbError, Session, UpdateStatus};
use filters::{Forbidden, Malformed, Unauthorized};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::{http::StatusCode, Rejection, Reply};

use crate::validation::ValidationError;

pub const BODY_LIMIT: u64 = 1024 * 16;

pub type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

#[derive(Serialize)]
pub struct FailureResponse {
    status: &'static str,
    code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl FailureResponse {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            status: "error",
            code,
            message: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: String) -> Self {
        Self {
            status: "error",
            code,
            message: Some(message),
        }
    }

    pub fn new_reply(code: ErrorCode) -> warp::reply::Json {
        warp::reply::json(&Self::new(code))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidCredentials,
    InsufficientAuthorization,
    MalformedData,
    ValidationFailed,
    InvalidID,
    InvalidStatus,
    InvalidTransition,
    UnknownInstructor,
    InstructorUnavailable,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

#[derive(Serialize)]
pub struct SimpleSuccessResponse {
    status: &'static str,
}

impl SimpleSuccessResponse {
    pub fn new() -> Self {
        Self { status: "success" }
    }
}

/// Body of the status override routes, parsed case-insensitively.
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Serialize)]
struct UpdateResponse {
    status: &'static str,
    updated: bool,
}

pub fn success<T: Serialize>(body: &T) -> JsonReply {
    warp::reply::with_status(warp::reply::json(body), StatusCode::OK)
}

pub fn failure(code: ErrorCode, status: StatusCode) -> JsonReply {
    warp::reply::with_status(FailureResponse::new_reply(code), status)
}

pub fn invalid_id() -> JsonReply {
    failure(ErrorCode::InvalidID, StatusCode::NOT_FOUND)
}

pub fn not_allowed() -> JsonReply {
    failure(ErrorCode::InsufficientAuthorization, StatusCode::UNAUTHORIZED)
}

pub fn validation_failure(error: ValidationError) -> JsonReply {
    warp::reply::with_status(
        warp::reply::json(&FailureResponse::with_message(
            ErrorCode::ValidationFailed,
            error.0,
        )),
        StatusCode::BAD_REQUEST,
    )
}

pub fn db_failure(error: DbError) -> JsonReply {
    let (code, status) = match &error {
        DbError::UnknownStatus { .. } => (ErrorCode::InvalidStatus, StatusCode::BAD_REQUEST),
        DbError::InvalidTransition { .. } => (ErrorCode::InvalidTransition, StatusCode::CONFLICT),
        DbError::UnknownInstructor(_) => (ErrorCode::UnknownInstructor, StatusCode::NOT_FOUND),
        DbError::InstructorUnavailable(_) => {
            (ErrorCode::InstructorUnavailable, StatusCode::CONFLICT)
        }
        DbError::Io(_) | DbError::Json(_) => {
            log::error!("database failure: {}", error);
            (
                ErrorCode::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    };

    warp::reply::with_status(
        warp::reply::json(&FailureResponse::with_message(code, error.to_string())),
        status,
    )
}

/// Admins manage every profile, instructors only the one resolved from their session.
pub fn manages_instructor(db: &impl Database, session: &Session, instructor_id: &str) -> bool {
    match session.role {
        Role::Admin => true,
        Role::Instructor => db
            .instructor_for_session(session)
            .map_or(false, |instructor| instructor.id == instructor_id),
        Role::Student => false,
    }
}

/// Replies to a mutation addressed by id.
pub fn update_reply(result: Result<UpdateStatus, DbError>) -> JsonReply {
    match result {
        Ok(UpdateStatus { found: false, .. }) => invalid_id(),
        Ok(UpdateStatus { updated, .. }) => success(&UpdateResponse {
            status: "success",
            updated,
        }),
        Err(error) => db_failure(error),
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let error_code;
    let status_code;

    if err.is_not_found() {
        error_code = ErrorCode::NotFound;
        status_code = StatusCode::NOT_FOUND;
    } else if let Some(Forbidden) = err.find() {
        error_code = ErrorCode::InvalidCredentials;
        status_code = StatusCode::FORBIDDEN;
    } else if let Some(Unauthorized) = err.find() {
        error_code = ErrorCode::InsufficientAuthorization;
        status_code = StatusCode::UNAUTHORIZED;
    } else if let Some(Malformed) = err.find() {
        error_code = ErrorCode::MalformedData;
        status_code = StatusCode::BAD_REQUEST;
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::InvalidQuery>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
    {
        error_code = ErrorCode::MalformedData;
        status_code = StatusCode::BAD_REQUEST;
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_code = ErrorCode::MethodNotAllowed;
        status_code = StatusCode::METHOD_NOT_ALLOWED;
    } else {
        error_code = ErrorCode::InternalServerError;
        status_code = StatusCode::INTERNAL_SERVER_ERROR;
    }

    let json = warp::reply::json(&FailureResponse::new(error_code));
    Ok(warp::reply::with_status(json, status_code))
}
