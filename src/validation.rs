//! Form checks run before anything is written. The first failing rule is reported as a single
//! message meant for the person filling the form.

use db::models::Role;
use serde::Deserialize;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

macro_rules! ensure {
    ($condition:expr, $message:literal) => {
        if !$condition {
            return Err(ValidationError($message.to_string()));
        }
    };
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn blank_or_missing(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, blank)
}

pub fn valid_email(email: &str) -> bool {
    !blank(email) && email.contains('@')
}

pub fn check_login(email: &str, password: &str) -> Result<(), ValidationError> {
    ensure!(!blank(email), "Email is required");
    ensure!(email.contains('@'), "Enter a valid email");
    ensure!(
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        "Password must be at least 6 characters"
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// Kept as typed so that a non-numeric price can be reported
    pub price_per_hour: Option<String>,
    pub car_type: Option<String>,
    pub languages: Option<String>,
}

impl Registration {
    /// Only meaningful once `check_registration` passed.
    pub fn price(&self) -> Option<u32> {
        self.price_per_hour
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
    }
}

pub fn check_registration(registration: &Registration) -> Result<(), ValidationError> {
    let r = registration;

    ensure!(r.role != Role::Admin, "Admin sign-up is not allowed");
    ensure!(!blank(&r.name), "Full name is required");
    ensure!(valid_email(&r.email), "Enter a valid email");
    ensure!(
        r.password.chars().count() >= MIN_PASSWORD_LENGTH,
        "Password must be at least 6 characters"
    );
    ensure!(r.password == r.confirm_password, "Passwords do not match");

    match r.role {
        Role::Student => {
            ensure!(!blank_or_missing(&r.phone), "Phone number is required");
            ensure!(!blank_or_missing(&r.address), "Address is required");
        }
        Role::Instructor => {
            ensure!(
                !blank_or_missing(&r.address),
                "Address is required for instructors"
            );
            ensure!(
                !blank_or_missing(&r.city),
                "City is required for instructors"
            );
            ensure!(
                !blank_or_missing(&r.price_per_hour),
                "Price per hour is required"
            );
            ensure!(r.price().is_some(), "Price must be a valid number");
            ensure!(!blank_or_missing(&r.car_type), "Car type is required");
            ensure!(!blank_or_missing(&r.languages), "Languages are required");
        }
        Role::Admin => {}
    }

    Ok(())
}

pub fn check_booking(student_email: &str) -> Result<(), ValidationError> {
    ensure!(valid_email(student_email), "Enter a valid email");
    Ok(())
}
