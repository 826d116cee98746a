pub mod auth;
pub mod configuration;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod posts;
pub mod repository;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod validators;
