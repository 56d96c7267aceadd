pub mod club;
pub mod committee;
pub mod course;
pub mod qualification;
pub mod region;
pub mod user;
