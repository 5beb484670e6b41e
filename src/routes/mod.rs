use warp::{Filter, Rejection, Reply};

use db::Db;

mod applications;
mod auth;
mod bookings;
mod changes;
mod globals;
mod instructors;
mod manage;
mod students;

pub use globals::handle_rejection;

pub fn routes(db: &Db) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    manage::routes(db)
        .or(auth::routes(db))
        .or(instructors::routes(db))
        .or(applications::routes(db))
        .or(bookings::routes(db))
        .or(students::routes(db))
        .or(changes::routes(db))
}
