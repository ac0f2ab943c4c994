pub mod delivery_proof;
pub mod job;
pub mod local_user;
pub mod person;
