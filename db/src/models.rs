use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::DbError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: String,
    pub name: String,
    pub address: String,
    pub price_per_hour: u32,
    pub rating: f64,
    pub city: String,
    pub languages: Vec<String>,
    pub verified: bool,
    pub car_type: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub status: InstructorStatus,
    /// Comma-joined day names, eg. "Mon,Wed,Fri"
    #[serde(default)]
    pub availability_days: Option<String>,
    #[serde(default)]
    pub availability_start_time: Option<String>,
    #[serde(default)]
    pub availability_end_time: Option<String>,
}

impl Instructor {
    pub fn is_active(&self) -> bool {
        self.status == InstructorStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Automatic,
    Manual,
}

impl Transmission {
    /// The gearbox is read from the free-text car type.
    pub fn matches(&self, car_type: &str) -> bool {
        let car_type = car_type.to_lowercase();

        match self {
            Self::Automatic => car_type.contains("automatic"),
            Self::Manual => car_type.contains("manual"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstructorStatus {
    Active,
    Suspended,
    Banned,
}

impl Default for InstructorStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    /// Reused as the instructor id once approved
    pub id: String,
    pub instructor_name: String,
    pub email: String,
    pub submitted_at: u64,
    pub status: ApplicationStatus,
    pub address: Option<String>,
    pub city: Option<String>,
    pub price_per_hour: Option<u32>,
    pub car_type: Option<String>,
    pub languages: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    /// Must name an instructor at request time, not re-checked afterwards
    pub instructor_id: String,
    pub student_name: String,
    pub student_email: String,
    /// Lesson start, milliseconds since the epoch
    pub epoch_time: i64,
    pub status: BookingStatus,
    pub pickup_location: Option<String>,
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Requested,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

macro_rules! status_strings {
    ($kind:literal, $ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DbError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(DbError::UnknownStatus {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

status_strings!("instructor", InstructorStatus {
    Active => "ACTIVE",
    Suspended => "SUSPENDED",
    Banned => "BANNED",
});

status_strings!("application", ApplicationStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

status_strings!("booking", BookingStatus {
    Requested => "REQUESTED",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
});

status_strings!("role", Role {
    Student => "STUDENT",
    Instructor => "INSTRUCTOR",
    Admin => "ADMIN",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!(
            "completed".parse::<BookingStatus>().unwrap(),
            BookingStatus::Completed
        );
        assert_eq!(
            " Suspended ".parse::<InstructorStatus>().unwrap(),
            InstructorStatus::Suspended
        );
        assert!("CONFIRMED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn statuses_serialize_upper_case() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"ADMIN\"").unwrap(),
            Role::Admin
        );
    }

    #[test]
    fn transmission_is_read_from_the_car_type() {
        assert!(Transmission::Automatic.matches("Sedan (Automatic)"));
        assert!(!Transmission::Manual.matches("Sedan (Automatic)"));
        assert!(Transmission::Manual.matches("Hatchback - MANUAL"));
        assert!(!Transmission::Automatic.matches("SUV"));
        assert!(!Transmission::Manual.matches("SUV"));
    }
}
