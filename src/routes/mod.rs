pub mod auth;
pub mod certificates;
pub mod clubs;
pub mod courses;
pub mod enrolments;
pub mod health;
pub mod qualifications;
pub mod regions;
pub mod users;
