//! Résumé intake and parsing pipeline
//!
//! Submits candidate résumés to an external parsing provider, reconciles the
//! provider's asynchronous jobs into a per-candidate parsing record, and
//! normalizes the parsed output into a cached candidate profile.

pub mod app_state;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;
