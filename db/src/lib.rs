use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

mod json;
pub mod lifecycle;
pub mod models;
pub mod search;
mod seed;
pub mod session;
mod utils;

pub use json::JSONDatabase;
pub use search::{SearchQuery, SortBy};
pub use seed::fixtures;
pub use session::Session;

use models::{
    Application, ApplicationStatus, Booking, BookingStatus, Instructor, InstructorStatus, Role,
    Student,
};
use utils::deserialize_some;

pub type Db = Arc<Mutex<JSONDatabase>>;

/// Opens the store at `filename`, creating and seeding it when the file does not exist yet.
pub fn new_db(filename: String, seed: bool) -> Result<Db, DbError> {
    Ok(Arc::new(Mutex::new(JSONDatabase::open(filename, seed)?)))
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unknown {kind} status \"{value}\"")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("{kind} {id} cannot go from {from} to {to}")]
    InvalidTransition {
        kind: &'static str,
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("no instructor with id {0}")]
    UnknownInstructor(String),

    #[error("instructor {0} is not taking bookings")]
    InstructorUnavailable(String),

    #[error("could not access the database file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not (de)serialize the database: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage operations, implemented by `JSONDatabase`.
pub trait Database {
    fn reset(&mut self) -> Result<(), DbError>;
    fn seed_if_empty(
        &mut self,
        fixtures: impl Iterator<Item = Instructor>,
    ) -> Result<(), DbError>;
    fn dump_as_json(&self) -> Result<String, serde_json::Error>;

    /// Every committed mutation is announced on this channel.
    fn subscribe(&self) -> broadcast::Receiver<Change>;

    fn auth_login(&mut self, email: &str, role: Role) -> (&Session, String);
    fn auth_logout(&mut self, token: &str) -> bool;
    fn auth_session(&self, token: &str) -> Option<&Session>;
    fn auth_session_mut(&mut self, token: &str) -> Option<&mut Session>;

    fn instructor_list(&self) -> Vec<&Instructor>;
    fn instructor_get(&self, id: &str) -> Option<&Instructor>;
    fn instructor_upsert(&mut self, instructor: Instructor) -> Result<(), DbError>;
    fn instructor_update(
        &mut self,
        id: &str,
        update: InstructorUpdate,
    ) -> Result<UpdateStatus, DbError>;
    fn instructor_set_status(
        &mut self,
        id: &str,
        status: InstructorStatus,
    ) -> Result<UpdateStatus, DbError>;

    fn instructor_search(&self, query: &SearchQuery) -> Vec<&Instructor> {
        search::search(self.instructor_list().into_iter(), query)
    }

    /// Instructors carry no email: the profile is the one created from the session's
    /// application, or failing any application, the one with the session's name.
    fn instructor_for_session(&self, session: &Session) -> Option<&Instructor> {
        match self.application_for_email(&session.email) {
            Some(application) => self.instructor_get(&application.id),
            None => self
                .instructor_list()
                .into_iter()
                .find(|i| i.name.eq_ignore_ascii_case(&session.name)),
        }
    }

    fn application_list(&self, status: Option<ApplicationStatus>) -> Vec<&Application>;
    fn application_get(&self, id: &str) -> Option<&Application>;
    fn application_submit(&mut self, application: NewApplication)
        -> Result<&Application, DbError>;
    fn application_approve(&mut self, id: &str) -> Result<UpdateStatus, DbError>;
    fn application_reject(&mut self, id: &str) -> Result<UpdateStatus, DbError>;

    /// Several applications may share an email, the earliest one wins.
    fn application_for_email(&self, email: &str) -> Option<&Application> {
        self.application_list(None)
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
    }

    fn booking_list(&self) -> Vec<&Booking>;
    fn booking_get(&self, id: &str) -> Option<&Booking>;
    fn booking_request(&mut self, booking: NewBooking) -> Result<&Booking, DbError>;
    /// Moves a booking along its lifecycle, refusing transitions out of terminal states.
    fn booking_transition(
        &mut self,
        id: &str,
        status: BookingStatus,
    ) -> Result<UpdateStatus, DbError>;
    /// Stores any known status regardless of the current one.
    fn booking_set_status(&mut self, id: &str, status: &str) -> Result<UpdateStatus, DbError>;
    /// Moves the lesson and sends the booking back for approval.
    fn booking_reschedule(&mut self, id: &str, epoch_time: i64)
        -> Result<UpdateStatus, DbError>;

    /// Newest lesson first.
    fn booking_list_for_student(&self, email: &str) -> Vec<&Booking> {
        let mut bookings: Vec<&Booking> = self
            .booking_list()
            .into_iter()
            .filter(|b| b.student_email.eq_ignore_ascii_case(email))
            .collect();

        bookings.sort_by(|a, b| b.epoch_time.cmp(&a.epoch_time));
        bookings
    }

    fn booking_list_for_instructor(&self, instructor_id: &str) -> Vec<&Booking> {
        self.booking_list()
            .into_iter()
            .filter(|b| b.instructor_id == instructor_id)
            .collect()
    }

    /// Open bookings of an instructor starting in `[from, to)`, earliest first.
    fn booking_schedule(&self, instructor_id: &str, from: i64, to: i64) -> Vec<&Booking> {
        let mut bookings: Vec<&Booking> = self
            .booking_list_for_instructor(instructor_id)
            .into_iter()
            .filter(|b| b.epoch_time >= from && b.epoch_time < to && b.is_open())
            .collect();

        bookings.sort_by_key(|b| b.epoch_time);
        bookings
    }

    fn student_get(&self, email: &str) -> Option<&Student>;
    /// Replaces the whole profile.
    fn student_upsert(&mut self, student: Student) -> Result<(), DbError>;
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Instructor { id: String },
    Application { id: String, status: ApplicationStatus },
    Booking { id: String, status: BookingStatus },
    /// Emails stay off the feed
    Student {
        #[serde(skip)]
        email: String,
    },
    Reset,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewApplication {
    /// Re-submitting with the id of a pending application replaces it
    pub id: Option<String>,
    pub instructor_name: String,
    pub email: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub price_per_hour: Option<u32>,
    pub car_type: Option<String>,
    pub languages: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewBooking {
    pub id: Option<String>,
    pub instructor_id: String,
    pub student_name: String,
    pub student_email: String,
    pub epoch_time: i64,
    pub pickup_location: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InstructorUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub price_per_hour: Option<u32>,
    pub city: Option<String>,
    pub languages: Option<Vec<String>>,
    pub car_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub photo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub availability_days: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub availability_start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub availability_end_time: Option<Option<String>>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UpdateStatus {
    pub found: bool,
    pub updated: bool,
}

impl UpdateStatus {
    pub fn missing() -> Self {
        Self {
            found: false,
            updated: false,
        }
    }

    pub fn found(updated: bool) -> Self {
        Self {
            found: true,
            updated,
        }
    }
}
