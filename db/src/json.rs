use bimap::BiMap;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tokio::sync::broadcast;

use super::{
    lifecycle::synthesize_instructor, seed::seed_db, Change, Database, DbError, InstructorUpdate,
    NewApplication, NewBooking, UpdateStatus,
};
use crate::models::{
    Application, ApplicationStatus, Booking, BookingStatus, Instructor, InstructorStatus, Role,
    Student,
};
use crate::session::{admin_name_from_email, Session};
use crate::utils::{now_millis, random_string};

const TOKEN_LENGTH: usize = 25;
const ID_LENGTH: usize = 12;
const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Serialize, Deserialize)]
pub struct JSONDatabase {
    #[serde(skip)]
    filename: Option<String>,
    instructors: IndexMap<String, Instructor>,
    applications: IndexMap<String, Application>,
    bookings: IndexMap<String, Booking>,
    /// Keyed by lower-cased email
    students: IndexMap<String, Student>,
    /// token <-> lower-cased email
    #[serde(skip)]
    tokens: BiMap<String, String>,
    #[serde(skip)]
    sessions: HashMap<String, Session>,
    #[serde(skip, default = "change_feed")]
    changes: broadcast::Sender<Change>,
    /// The tables as last written to disk
    #[serde(skip)]
    saved: Option<Tables>,
}

#[derive(Clone)]
struct Tables {
    instructors: IndexMap<String, Instructor>,
    applications: IndexMap<String, Application>,
    bookings: IndexMap<String, Booking>,
    students: IndexMap<String, Student>,
}

fn change_feed() -> broadcast::Sender<Change> {
    broadcast::channel(CHANGE_FEED_CAPACITY).0
}

impl JSONDatabase {
    /// Reads the store from disk, or creates it (seeding the demo directory when `seed` is set)
    /// if the file does not exist yet.
    pub fn open(filename: String, seed: bool) -> Result<Self, DbError> {
        if Path::new(&filename).exists() {
            let mut db = Self::from_file(&filename)?;
            db.filename = Some(filename);
            db.saved = Some(db.tables());
            return Ok(db);
        }

        let mut db = Self::in_memory();
        db.filename = Some(filename);

        if seed {
            seed_db(&mut db)?;
        }

        db.save()?;
        Ok(db)
    }

    /// Empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            filename: None,
            instructors: IndexMap::new(),
            applications: IndexMap::new(),
            bookings: IndexMap::new(),
            students: IndexMap::new(),
            tokens: BiMap::new(),
            sessions: HashMap::new(),
            changes: change_feed(),
            saved: None,
        }
    }

    fn from_file(filename: &str) -> Result<Self, DbError> {
        let contents = {
            let mut file = File::open(filename)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            contents
        };

        Ok(serde_json::from_str(&contents)?)
    }

    fn tables(&self) -> Tables {
        Tables {
            instructors: self.instructors.clone(),
            applications: self.applications.clone(),
            bookings: self.bookings.clone(),
            students: self.students.clone(),
        }
    }

    fn persist(&mut self) -> Result<(), DbError> {
        if let Some(filename) = &self.filename {
            let mut output = File::create(filename)?;
            write!(output, "{}", self.dump_as_json()?)?;
            self.saved = Some(self.tables());
        }
        Ok(())
    }

    /// Persists, or puts the tables back as they were on disk if that fails.
    fn save(&mut self) -> Result<(), DbError> {
        let error = match self.persist() {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };

        if let Some(saved) = self.saved.clone() {
            warn!("could not save the database, rolling back: {}", error);
            self.instructors = saved.instructors;
            self.applications = saved.applications;
            self.bookings = saved.bookings;
            self.students = saved.students;
        }

        Err(error)
    }

    /// Saves, then tells subscribers.
    fn commit(&mut self, changes: Vec<Change>) -> Result<(), DbError> {
        self.save()?;

        for change in changes {
            // Nobody listening is fine
            let _ = self.changes.send(change);
        }

        Ok(())
    }

    fn resolve_name(&self, email: &str, role: Role) -> String {
        let found = match role {
            Role::Student => self.student_get(email).map(|s| s.name.clone()),
            Role::Instructor => self
                .application_for_email(email)
                .map(|a| a.instructor_name.clone()),
            Role::Admin => Some(admin_name_from_email(email)),
        };

        found.unwrap_or_else(|| email.to_string())
    }
}

impl Database for JSONDatabase {
    fn reset(&mut self) -> Result<(), DbError> {
        self.instructors.clear();
        self.applications.clear();
        self.bookings.clear();
        self.students.clear();
        self.tokens.clear();
        self.sessions.clear();

        seed_db(self)?;

        info!("database reset");
        self.commit(vec![Change::Reset])
    }

    fn seed_if_empty(
        &mut self,
        fixtures: impl Iterator<Item = Instructor>,
    ) -> Result<(), DbError> {
        if !self.instructors.is_empty() {
            return Ok(());
        }

        for instructor in fixtures {
            self.instructors.insert(instructor.id.clone(), instructor);
        }

        info!("seeded {} instructors", self.instructors.len());
        self.save()
    }

    fn dump_as_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }

    fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    fn auth_login(&mut self, email: &str, role: Role) -> (&Session, String) {
        let mut session = Session::new(&self.resolve_name(email, role), email, role);

        if let (Role::Student, Some(student)) = (role, self.student_get(email)) {
            session.set_student_profile(
                &student.name,
                &student.email,
                &student.phone,
                &student.address,
            );
        }

        let token = random_string(TOKEN_LENGTH);

        // One token per account, logging in again drops the previous one
        if let Some((old_token, _)) = self.tokens.remove_by_right(&email.to_lowercase()) {
            self.sessions.remove(&old_token);
        }

        self.tokens.insert(token.clone(), email.to_lowercase());
        info!("{} signed in as {}", email, role);

        let session: &Session = self.sessions.entry(token.clone()).or_insert(session);
        (session, token)
    }

    fn auth_logout(&mut self, token: &str) -> bool {
        let removed = self.tokens.remove_by_left(token).is_some();

        if let Some(mut session) = self.sessions.remove(token) {
            session.clear();
        }

        removed
    }

    fn auth_session(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    fn auth_session_mut(&mut self, token: &str) -> Option<&mut Session> {
        self.sessions.get_mut(token)
    }

    fn instructor_list(&self) -> Vec<&Instructor> {
        self.instructors.values().collect()
    }

    fn instructor_get(&self, id: &str) -> Option<&Instructor> {
        self.instructors.get(id)
    }

    fn instructor_upsert(&mut self, instructor: Instructor) -> Result<(), DbError> {
        let id = instructor.id.clone();
        self.instructors.insert(id.clone(), instructor);

        info!("instructor {} saved", id);
        self.commit(vec![Change::Instructor { id }])
    }

    fn instructor_update(
        &mut self,
        id: &str,
        update: InstructorUpdate,
    ) -> Result<UpdateStatus, DbError> {
        let instructor = match self.instructors.get_mut(id) {
            Some(instructor) => instructor,
            None => return Ok(UpdateStatus::missing()),
        };

        let mut updated = false;

        macro_rules! update {
            ($property:ident) => {
                if let Some(value) = update.$property {
                    instructor.$property = value;
                    updated = true;
                }
            };
        }

        update!(name);
        update!(address);
        update!(price_per_hour);
        update!(city);
        update!(languages);
        update!(car_type);
        update!(photo_url);
        update!(availability_days);
        update!(availability_start_time);
        update!(availability_end_time);

        if updated {
            info!("instructor {} profile updated", id);
            self.commit(vec![Change::Instructor { id: id.to_string() }])?;
        }

        Ok(UpdateStatus::found(updated))
    }

    fn instructor_set_status(
        &mut self,
        id: &str,
        status: InstructorStatus,
    ) -> Result<UpdateStatus, DbError> {
        let instructor = match self.instructors.get_mut(id) {
            Some(instructor) => instructor,
            None => return Ok(UpdateStatus::missing()),
        };

        if instructor.status == status {
            return Ok(UpdateStatus::found(false));
        }

        instructor.status = status;

        info!("instructor {} is now {}", id, status);
        self.commit(vec![Change::Instructor { id: id.to_string() }])?;
        Ok(UpdateStatus::found(true))
    }

    fn application_list(&self, status: Option<ApplicationStatus>) -> Vec<&Application> {
        self.applications
            .values()
            .filter(|a| status.map_or(true, |status| a.status == status))
            .collect()
    }

    fn application_get(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    fn application_submit(
        &mut self,
        application: NewApplication,
    ) -> Result<&Application, DbError> {
        let id = application
            .id
            .unwrap_or_else(|| random_string(ID_LENGTH));

        // Only a pending application can be edited, and it keeps its place in the queue
        let submitted_at = match self.applications.get(&id) {
            Some(existing) if existing.status != ApplicationStatus::Pending => {
                warn!("refusing to resubmit {} application {}", existing.status, id);
                return Err(DbError::InvalidTransition {
                    kind: "application",
                    id,
                    from: existing.status.as_str(),
                    to: ApplicationStatus::Pending.as_str(),
                });
            }
            Some(existing) => existing.submitted_at,
            None => now_millis(),
        };

        let application = Application {
            id: id.clone(),
            instructor_name: application.instructor_name,
            email: application.email,
            submitted_at,
            status: ApplicationStatus::Pending,
            address: application.address,
            city: application.city,
            price_per_hour: application.price_per_hour,
            car_type: application.car_type,
            languages: application.languages,
        };

        info!("application {} submitted by {}", id, application.email);
        self.applications.insert(id.clone(), application);

        self.commit(vec![Change::Application {
            id: id.clone(),
            status: ApplicationStatus::Pending,
        }])?;

        Ok(&self.applications[&id])
    }

    fn application_approve(&mut self, id: &str) -> Result<UpdateStatus, DbError> {
        let application = match self.applications.get_mut(id) {
            Some(application) => application,
            None => return Ok(UpdateStatus::missing()),
        };

        let next = ApplicationStatus::Approved;
        if !application.status.can_become(next) {
            warn!("refusing to approve {} application {}", application.status, id);
            return Err(DbError::InvalidTransition {
                kind: "application",
                id: id.to_string(),
                from: application.status.as_str(),
                to: next.as_str(),
            });
        }

        application.status = next;

        // Replaces any instructor already created from this application
        let instructor = synthesize_instructor(application);
        self.instructors.insert(instructor.id.clone(), instructor);

        info!("application {} approved", id);
        self.commit(vec![
            Change::Application {
                id: id.to_string(),
                status: next,
            },
            Change::Instructor { id: id.to_string() },
        ])?;

        Ok(UpdateStatus::found(true))
    }

    fn application_reject(&mut self, id: &str) -> Result<UpdateStatus, DbError> {
        let application = match self.applications.get_mut(id) {
            Some(application) => application,
            None => return Ok(UpdateStatus::missing()),
        };

        let next = ApplicationStatus::Rejected;
        if !application.status.can_become(next) {
            warn!("refusing to reject {} application {}", application.status, id);
            return Err(DbError::InvalidTransition {
                kind: "application",
                id: id.to_string(),
                from: application.status.as_str(),
                to: next.as_str(),
            });
        }

        let updated = application.status != next;
        application.status = next;

        info!("application {} rejected", id);
        self.commit(vec![Change::Application {
            id: id.to_string(),
            status: next,
        }])?;

        Ok(UpdateStatus::found(updated))
    }

    fn booking_list(&self) -> Vec<&Booking> {
        self.bookings.values().collect()
    }

    fn booking_get(&self, id: &str) -> Option<&Booking> {
        self.bookings.get(id)
    }

    fn booking_request(&mut self, booking: NewBooking) -> Result<&Booking, DbError> {
        match self.instructors.get(&booking.instructor_id) {
            None => return Err(DbError::UnknownInstructor(booking.instructor_id)),
            Some(instructor) if !instructor.is_active() => {
                return Err(DbError::InstructorUnavailable(booking.instructor_id))
            }
            Some(_) => {}
        }

        let id = booking.id.unwrap_or_else(|| random_string(ID_LENGTH));

        let booking = Booking {
            id: id.clone(),
            instructor_id: booking.instructor_id,
            student_name: booking.student_name,
            student_email: booking.student_email,
            epoch_time: booking.epoch_time,
            status: BookingStatus::Requested,
            pickup_location: booking.pickup_location,
            note: booking.note,
        };

        info!(
            "booking {} requested with instructor {} by {}",
            id, booking.instructor_id, booking.student_email
        );
        self.bookings.insert(id.clone(), booking);

        self.commit(vec![Change::Booking {
            id: id.clone(),
            status: BookingStatus::Requested,
        }])?;

        Ok(&self.bookings[&id])
    }

    fn booking_transition(
        &mut self,
        id: &str,
        status: BookingStatus,
    ) -> Result<UpdateStatus, DbError> {
        let current = match self.bookings.get(id) {
            Some(booking) => booking.status,
            None => return Ok(UpdateStatus::missing()),
        };

        if !current.can_become(status) {
            warn!("refusing to move booking {} from {} to {}", id, current, status);
            return Err(DbError::InvalidTransition {
                kind: "booking",
                id: id.to_string(),
                from: current.as_str(),
                to: status.as_str(),
            });
        }

        self.booking_set_status(id, status.as_str())
    }

    fn booking_set_status(&mut self, id: &str, status: &str) -> Result<UpdateStatus, DbError> {
        let status: BookingStatus = status.parse()?;

        let booking = match self.bookings.get_mut(id) {
            Some(booking) => booking,
            None => return Ok(UpdateStatus::missing()),
        };

        let updated = booking.status != status;
        booking.status = status;

        info!("booking {} is now {}", id, status);
        self.commit(vec![Change::Booking {
            id: id.to_string(),
            status,
        }])?;

        Ok(UpdateStatus::found(updated))
    }

    fn booking_reschedule(
        &mut self,
        id: &str,
        epoch_time: i64,
    ) -> Result<UpdateStatus, DbError> {
        let booking = match self.bookings.get_mut(id) {
            Some(booking) => booking,
            None => return Ok(UpdateStatus::missing()),
        };

        booking.epoch_time = epoch_time;
        booking.status = BookingStatus::Requested;

        info!("booking {} moved to {}", id, epoch_time);
        self.commit(vec![Change::Booking {
            id: id.to_string(),
            status: BookingStatus::Requested,
        }])?;

        Ok(UpdateStatus::found(true))
    }

    fn student_get(&self, email: &str) -> Option<&Student> {
        self.students.get(&email.to_lowercase())
    }

    fn student_upsert(&mut self, student: Student) -> Result<(), DbError> {
        let email = student.email.clone();
        self.students.insert(email.to_lowercase(), student);

        info!("student {} saved", email);
        self.commit(vec![Change::Student { email }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    const T: i64 = 1_760_000_000_000;

    fn db() -> JSONDatabase {
        let mut db = JSONDatabase::in_memory();
        db.seed_if_empty(fixtures().into_iter()).unwrap();
        db
    }

    fn new_application(id: &str, name: &str, email: &str) -> NewApplication {
        NewApplication {
            id: Some(id.to_string()),
            instructor_name: name.to_string(),
            email: email.to_string(),
            address: None,
            city: None,
            price_per_hour: None,
            car_type: None,
            languages: None,
        }
    }

    fn new_booking(id: &str, instructor_id: &str, epoch_time: i64) -> NewBooking {
        NewBooking {
            id: Some(id.to_string()),
            instructor_id: instructor_id.to_string(),
            student_name: "Sam".to_string(),
            student_email: "sam@x.com".to_string(),
            epoch_time,
            pickup_location: None,
            note: None,
        }
    }

    #[test]
    fn approving_an_application_creates_an_instructor() {
        let mut db = JSONDatabase::in_memory();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();

        assert_eq!(
            db.application_approve("a1").unwrap(),
            UpdateStatus::found(true)
        );

        let instructor = db.instructor_get("a1").unwrap();
        assert!(instructor.verified);
        assert_eq!(instructor.status, InstructorStatus::Active);
        assert_eq!(instructor.name, "Jane");
        assert_eq!(
            db.application_get("a1").unwrap().status,
            ApplicationStatus::Approved
        );
    }

    #[test]
    fn approving_twice_gives_the_same_single_instructor() {
        let mut db = db();
        let before = db.instructor_list().len();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();

        db.application_approve("a1").unwrap();
        let first = db.instructor_get("a1").unwrap().clone();
        db.application_approve("a1").unwrap();

        assert_eq!(db.instructor_get("a1").unwrap(), &first);
        assert_eq!(db.instructor_list().len(), before + 1);
    }

    #[test]
    fn rejecting_never_creates_an_instructor() {
        let mut db = JSONDatabase::in_memory();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();

        db.application_reject("a1").unwrap();

        assert!(db.instructor_get("a1").is_none());
        assert_eq!(
            db.application_get("a1").unwrap().status,
            ApplicationStatus::Rejected
        );
        assert!(matches!(
            db.application_approve("a1"),
            Err(DbError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn unknown_applications_are_reported_not_mutated() {
        let mut db = db();
        let before = db.dump_as_json().unwrap();

        assert_eq!(
            db.application_approve("nope").unwrap(),
            UpdateStatus::missing()
        );
        assert_eq!(
            db.application_reject("nope").unwrap(),
            UpdateStatus::missing()
        );
        assert_eq!(db.dump_as_json().unwrap(), before);
    }

    #[test]
    fn resubmitting_replaces_a_pending_application() {
        let mut db = JSONDatabase::in_memory();
        let submitted_at = db
            .application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap()
            .submitted_at;

        let mut again = new_application("a1", "Jane Doe", "jane@x.com");
        again.city = Some("Ottawa".to_string());
        db.application_submit(again).unwrap();

        let application = db.application_get("a1").unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.instructor_name, "Jane Doe");
        assert_eq!(application.city.as_deref(), Some("Ottawa"));
        assert_eq!(application.submitted_at, submitted_at);
        assert_eq!(db.application_list(None).len(), 1);
    }

    #[test]
    fn decided_applications_cannot_be_resubmitted() {
        let mut db = JSONDatabase::in_memory();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();
        db.application_submit(new_application("a2", "Joe", "joe@x.com"))
            .unwrap();
        db.application_approve("a1").unwrap();
        db.application_reject("a2").unwrap();

        for id in &["a1", "a2"] {
            assert!(matches!(
                db.application_submit(new_application(id, "Again", "again@x.com")),
                Err(DbError::InvalidTransition { .. })
            ));
        }

        assert_eq!(
            db.application_get("a1").unwrap().status,
            ApplicationStatus::Approved
        );
        assert_eq!(db.application_get("a1").unwrap().instructor_name, "Jane");
        assert_eq!(
            db.application_get("a2").unwrap().status,
            ApplicationStatus::Rejected
        );
        assert!(db.instructor_get("a1").is_some());
    }

    #[test]
    fn duplicate_emails_are_allowed_and_the_earliest_wins() {
        let mut db = JSONDatabase::in_memory();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();
        db.application_submit(new_application("a2", "Jane Again", "J@X.com"))
            .unwrap();

        assert_eq!(db.application_list(None).len(), 2);
        assert_eq!(db.application_for_email("j@x.com").unwrap().id, "a1");
        assert_eq!(
            db.application_list(Some(ApplicationStatus::Pending)).len(),
            2
        );
    }

    #[test]
    fn rescheduling_reopens_the_booking() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();
        db.booking_transition("b1", BookingStatus::Approved).unwrap();

        db.booking_reschedule("b1", T + 3_600_000).unwrap();

        let booking = db.booking_get("b1").unwrap();
        assert_eq!(booking.epoch_time, T + 3_600_000);
        assert_eq!(booking.status, BookingStatus::Requested);
    }

    #[test]
    fn rescheduling_ignores_the_previous_status() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();
        db.booking_transition("b1", BookingStatus::Cancelled).unwrap();

        db.booking_reschedule("b1", T + 1).unwrap();

        assert_eq!(
            db.booking_get("b1").unwrap().status,
            BookingStatus::Requested
        );
    }

    #[test]
    fn bookings_at_the_same_instant_coexist() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();
        db.booking_request(new_booking("b2", "1", T)).unwrap();

        let bookings = db.booking_list_for_instructor("1");
        assert_eq!(bookings.len(), 2);
        assert!(bookings
            .iter()
            .all(|b| b.status == BookingStatus::Requested && b.epoch_time == T));
    }

    #[test]
    fn set_status_normalizes_and_skips_transition_checks() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();

        db.booking_set_status("b1", "completed").unwrap();
        assert_eq!(
            db.booking_get("b1").unwrap().status,
            BookingStatus::Completed
        );

        assert!(matches!(
            db.booking_set_status("b1", "confirmed"),
            Err(DbError::UnknownStatus { .. })
        ));
        assert_eq!(
            db.booking_set_status("missing", "approved").unwrap(),
            UpdateStatus::missing()
        );
    }

    #[test]
    fn checked_transitions_refuse_terminal_bookings() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();

        assert!(matches!(
            db.booking_transition("b1", BookingStatus::Completed),
            Err(DbError::InvalidTransition { .. })
        ));

        db.booking_transition("b1", BookingStatus::Approved).unwrap();
        db.booking_transition("b1", BookingStatus::Completed).unwrap();

        assert!(db
            .booking_transition("b1", BookingStatus::Cancelled)
            .is_err());
    }

    #[test]
    fn booking_requests_need_an_active_instructor() {
        let mut db = db();

        assert!(matches!(
            db.booking_request(new_booking("b1", "unknown", T)),
            Err(DbError::UnknownInstructor(_))
        ));

        db.booking_request(new_booking("b1", "2", T)).unwrap();
        db.instructor_set_status("2", InstructorStatus::Suspended)
            .unwrap();

        assert!(matches!(
            db.booking_request(new_booking("b2", "2", T)),
            Err(DbError::InstructorUnavailable(_))
        ));
        // Existing bookings are left alone
        assert_eq!(
            db.booking_get("b1").unwrap().status,
            BookingStatus::Requested
        );
    }

    #[test]
    fn student_bookings_are_newest_first_and_case_insensitive() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();
        db.booking_request(new_booking("b2", "3", T + 10)).unwrap();

        let mut other = new_booking("b3", "3", T + 20);
        other.student_email = "other@x.com".to_string();
        db.booking_request(other).unwrap();

        let ids: Vec<&str> = db
            .booking_list_for_student("SAM@x.com")
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b2", "b1"]);
    }

    #[test]
    fn schedule_keeps_open_bookings_in_the_window() {
        let mut db = db();
        db.booking_request(new_booking("late", "1", T + 500)).unwrap();
        db.booking_request(new_booking("early", "1", T + 100)).unwrap();
        db.booking_request(new_booking("gone", "1", T + 200)).unwrap();
        db.booking_request(new_booking("outside", "1", T + 1000)).unwrap();
        db.booking_transition("gone", BookingStatus::Cancelled).unwrap();

        let ids: Vec<&str> = db
            .booking_schedule("1", T, T + 1000)
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn instructor_update_is_partial() {
        let mut db = db();

        let update = InstructorUpdate {
            availability_days: Some(Some("Mon,Wed".to_string())),
            availability_start_time: Some(Some("9:00 AM".to_string())),
            price_per_hour: Some(55),
            ..InstructorUpdate::default()
        };
        assert_eq!(
            db.instructor_update("1", update).unwrap(),
            UpdateStatus::found(true)
        );

        let instructor = db.instructor_get("1").unwrap();
        assert_eq!(instructor.price_per_hour, 55);
        assert_eq!(instructor.availability_days.as_deref(), Some("Mon,Wed"));
        assert_eq!(instructor.name, "Sara Ahmed");

        assert_eq!(
            db.instructor_update("1", InstructorUpdate::default())
                .unwrap(),
            UpdateStatus::found(false)
        );
        assert_eq!(
            db.instructor_update("nope", InstructorUpdate::default())
                .unwrap(),
            UpdateStatus::missing()
        );
    }

    #[test]
    fn upsert_keeps_directory_order() {
        let mut db = db();
        let mut sara = db.instructor_get("1").unwrap().clone();
        sara.rating = 3.0;

        db.instructor_upsert(sara).unwrap();

        assert_eq!(db.instructor_list()[0].id, "1");
        assert_eq!(db.instructor_get("1").unwrap().rating, 3.0);
    }

    #[test]
    fn login_resolves_names_by_role() {
        let mut db = db();
        db.student_upsert(Student {
            email: "Sam@x.com".to_string(),
            name: "Sam".to_string(),
            phone: "555".to_string(),
            address: "1 Main St".to_string(),
        })
        .unwrap();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();

        let (student, _) = db.auth_login("sam@x.com", Role::Student);
        assert_eq!(student.name, "Sam");
        assert_eq!(student.phone.as_deref(), Some("555"));

        let (instructor, _) = db.auth_login("J@x.com", Role::Instructor);
        assert_eq!(instructor.name, "Jane");

        let (admin, _) = db.auth_login("jane.doe@drivetree.ca", Role::Admin);
        assert_eq!(admin.name, "Jane Doe");

        let (unknown, _) = db.auth_login("who@x.com", Role::Student);
        assert_eq!(unknown.name, "who@x.com");
    }

    #[test]
    fn sessions_are_replaced_on_login_and_removed_on_logout() {
        let mut db = db();

        let (_, first) = db.auth_login("sam@x.com", Role::Student);
        let (_, second) = db.auth_login("sam@x.com", Role::Student);

        assert!(db.auth_session(&first).is_none());
        assert!(db.auth_session(&second).is_some());

        assert!(db.auth_logout(&second));
        assert!(db.auth_session(&second).is_none());
        assert!(!db.auth_logout(&second));
    }

    #[test]
    fn instructor_session_finds_its_profile() {
        let mut db = db();
        db.application_submit(new_application("a1", "Jane", "j@x.com"))
            .unwrap();

        let (session, _) = db.auth_login("j@x.com", Role::Instructor);
        let session = session.clone();
        assert!(db.instructor_for_session(&session).is_none());

        db.application_approve("a1").unwrap();
        assert_eq!(db.instructor_for_session(&session).unwrap().id, "a1");

        // No application: fall back to the name
        let by_name = Session::new("sara ahmed", "sara@x.com", Role::Instructor);
        assert_eq!(db.instructor_for_session(&by_name).unwrap().id, "1");
    }

    #[test]
    fn mutations_are_announced() {
        let mut db = db();
        let mut changes = db.subscribe();

        db.booking_request(new_booking("b1", "1", T)).unwrap();

        match changes.try_recv().unwrap() {
            Change::Booking { id, status } => {
                assert_eq!(id, "b1");
                assert_eq!(status, BookingStatus::Requested);
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn seeding_only_happens_on_an_empty_directory() {
        let mut db = db();
        let count = db.instructor_list().len();

        db.seed_if_empty(fixtures().into_iter().take(2)).unwrap();
        assert_eq!(db.instructor_list().len(), count);
    }

    #[test]
    fn store_survives_a_restart_without_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json").to_string_lossy().to_string();

        let token = {
            let mut db = JSONDatabase::open(path.clone(), true).unwrap();
            db.booking_request(new_booking("b1", "1", T)).unwrap();
            let (_, token) = db.auth_login("sam@x.com", Role::Student);
            token
        };

        let db = JSONDatabase::open(path, true).unwrap();
        assert_eq!(db.booking_get("b1").unwrap().epoch_time, T);
        assert_eq!(db.instructor_list().len(), fixtures().len());
        assert!(db.auth_session(&token).is_none());
    }

    #[test]
    fn failed_writes_leave_the_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json").to_string_lossy().to_string();

        let mut db = JSONDatabase::open(path, true).unwrap();
        let mut feed = db.subscribe();
        dir.close().unwrap();

        let update = InstructorUpdate {
            price_per_hour: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            db.instructor_update("1", update),
            Err(DbError::Io(_))
        ));
        assert!(matches!(
            db.booking_request(new_booking("b1", "1", T)),
            Err(DbError::Io(_))
        ));

        assert_eq!(db.instructor_get("1").unwrap().price_per_hour, 45);
        assert!(db.booking_get("b1").is_none());
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn reset_restores_the_fixtures() {
        let mut db = db();
        db.booking_request(new_booking("b1", "1", T)).unwrap();
        db.instructor_set_status("1", InstructorStatus::Banned)
            .unwrap();

        db.reset().unwrap();

        assert!(db.booking_list().is_empty());
        assert!(db.instructor_get("1").unwrap().is_active());
    }
}
