pub mod core;
pub mod course_units;
pub mod directory;
pub mod exchange;
pub mod grades;
pub mod session;
pub mod setup;
pub mod stats;
pub mod structure;
pub mod students;
pub mod transcript;
pub mod users;
