//! Status transitions for applications and bookings, and the instructor profile derived from an
//! approved application.

use crate::models::{Application, ApplicationStatus, Booking, BookingStatus, Instructor, InstructorStatus};

pub const DEFAULT_ADDRESS: &str = "To be updated";
pub const DEFAULT_PRICE_PER_HOUR: u32 = 45;
pub const DEFAULT_CITY: &str = "Toronto";
pub const DEFAULT_CAR_TYPE: &str = "Sedan (Automatic)";
pub const DEFAULT_LANGUAGE: &str = "English";

impl ApplicationStatus {
    /// Re-applying a terminal status is accepted so that approving twice re-derives the same
    /// instructor.
    pub fn can_become(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) => true,
            (current, next) => *current == next && next != Pending,
        }
    }
}

impl BookingStatus {
    pub fn can_become(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        if *self == next {
            return true;
        }

        match self {
            Requested => matches!(next, Approved | Rejected | Cancelled),
            Approved => matches!(next, Completed | Cancelled | Rejected),
            Rejected | Cancelled | Completed => false,
        }
    }

    /// States a student may still cancel or reschedule from.
    pub fn is_open(&self) -> bool {
        matches!(self, BookingStatus::Requested | BookingStatus::Approved)
    }
}

impl Booking {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Builds the instructor profile created when `application` is approved.
pub fn synthesize_instructor(application: &Application) -> Instructor {
    Instructor {
        id: application.id.clone(),
        name: application.instructor_name.clone(),
        address: application
            .address
            .clone()
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        price_per_hour: application
            .price_per_hour
            .unwrap_or(DEFAULT_PRICE_PER_HOUR),
        rating: 0.0,
        city: application
            .city
            .clone()
            .unwrap_or_else(|| DEFAULT_CITY.to_string()),
        languages: split_languages(application.languages.as_deref()),
        verified: true,
        car_type: application
            .car_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CAR_TYPE.to_string()),
        photo_url: None,
        status: InstructorStatus::Active,
        availability_days: None,
        availability_start_time: None,
        availability_end_time: None,
    }
}

/// Splits a comma-joined language list, falling back to English when nothing is left.
pub fn split_languages(languages: Option<&str>) -> Vec<String> {
    let languages: Vec<String> = languages
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if languages.is_empty() {
        vec![DEFAULT_LANGUAGE.to_string()]
    } else {
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> Application {
        Application {
            id: "a1".to_string(),
            instructor_name: "Jane".to_string(),
            email: "j@x.com".to_string(),
            submitted_at: 0,
            status: ApplicationStatus::Pending,
            address: None,
            city: None,
            price_per_hour: None,
            car_type: None,
            languages: None,
        }
    }

    #[test]
    fn approval_defaults_fill_missing_fields() {
        let instructor = synthesize_instructor(&application());

        assert_eq!(instructor.id, "a1");
        assert_eq!(instructor.name, "Jane");
        assert_eq!(instructor.address, "To be updated");
        assert_eq!(instructor.price_per_hour, 45);
        assert_eq!(instructor.city, "Toronto");
        assert_eq!(instructor.car_type, "Sedan (Automatic)");
        assert_eq!(instructor.languages, vec!["English".to_string()]);
        assert!(instructor.verified);
        assert_eq!(instructor.status, InstructorStatus::Active);
        assert_eq!(instructor.rating, 0.0);
    }

    #[test]
    fn approval_keeps_provided_fields() {
        let instructor = synthesize_instructor(&Application {
            address: Some("1 Yonge St".to_string()),
            city: Some("Ottawa".to_string()),
            price_per_hour: Some(60),
            car_type: Some("Civic (Manual)".to_string()),
            languages: Some(" EN, FR ,,".to_string()),
            ..application()
        });

        assert_eq!(instructor.address, "1 Yonge St");
        assert_eq!(instructor.city, "Ottawa");
        assert_eq!(instructor.price_per_hour, 60);
        assert_eq!(instructor.car_type, "Civic (Manual)");
        assert_eq!(instructor.languages, vec!["EN".to_string(), "FR".to_string()]);
    }

    #[test]
    fn blank_languages_fall_back_to_english() {
        assert_eq!(split_languages(Some("  , ")), vec!["English".to_string()]);
    }

    #[test]
    fn application_terminal_states_do_not_flip() {
        use ApplicationStatus::*;

        assert!(Pending.can_become(Approved));
        assert!(Pending.can_become(Rejected));
        assert!(Approved.can_become(Approved));
        assert!(!Approved.can_become(Rejected));
        assert!(!Rejected.can_become(Approved));
        assert!(!Rejected.can_become(Pending));
        assert!(!Pending.can_become(Pending));
    }

    #[test]
    fn booking_transitions() {
        use BookingStatus::*;

        assert!(Requested.can_become(Approved));
        assert!(Requested.can_become(Cancelled));
        assert!(!Requested.can_become(Completed));
        assert!(Approved.can_become(Completed));
        assert!(!Completed.can_become(Cancelled));
        assert!(!Cancelled.can_become(Requested));
        assert!(Cancelled.can_become(Cancelled));

        assert!(Requested.is_open());
        assert!(Approved.is_open());
        assert!(!Rejected.is_open());
    }
}
