//! Discord webhook routing across groups and services, with a health sweep
//! that probes every enabled link's endpoint and records the outcome.

pub mod db;
pub mod entities;
pub mod error;
pub mod health;
pub mod models;
pub mod registry;
pub mod routes;
pub mod state;
pub mod webhook;
