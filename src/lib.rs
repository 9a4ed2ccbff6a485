//! Progression, badges, personalized content and plan gating for the
//! tech-learning quest app.

pub mod auth;
pub mod cache;
pub mod config;
pub mod constants;
pub mod extractors;
pub mod logging;
pub mod middleware;
pub mod progression;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
pub mod workers;
