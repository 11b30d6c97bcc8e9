//! HTTP relay that turns two uploaded images into a glTF binary via an
//! external model generator.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
