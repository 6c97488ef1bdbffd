//! Tutoring marketplace booking service.
//!
//! Tutors publish shifts, parents and students spend prepaid tickets to book them, and
//! tutors file a report after each lesson. The rules that tie those together live in
//! [`engine`]; everything around it is HTTP plumbing.

pub mod config;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
