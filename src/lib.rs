//! Course Enroll: client for the student enrollment workflow.

pub mod api;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod profile;
pub mod session;
pub mod store;
