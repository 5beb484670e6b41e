use serde::Serialize;

use crate::models::Role;

/// Whoever is signed in behind a bearer token. Lives until logout or restart, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Session {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(skip)]
    show_bookings_tab: bool,
}

impl Session {
    pub fn new(name: &str, email: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            role,
            phone: None,
            address: None,
            show_bookings_tab: false,
        }
    }

    pub fn set_user(&mut self, name: &str, email: &str, role: Role) {
        self.name = name.to_string();
        self.email = email.to_string();
        self.role = role;
    }

    pub fn set_student_profile(&mut self, name: &str, email: &str, phone: &str, address: &str) {
        self.set_user(name, email, Role::Student);
        self.phone = Some(phone.to_string());
        self.address = Some(address.to_string());
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.email.clear();
        self.phone = None;
        self.address = None;
        self.show_bookings_tab = false;
    }

    pub fn is(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }

    pub fn request_bookings_tab(&mut self) {
        self.show_bookings_tab = true;
    }

    /// One-shot: reading the flag resets it.
    pub fn take_show_bookings_tab(&mut self) -> bool {
        std::mem::replace(&mut self.show_bookings_tab, false)
    }
}

/// Display name for an administrator, derived from the email local part: "jane.doe@x" gives
/// "Jane Doe".
pub fn admin_name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or("")
        .split('.')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<String>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
