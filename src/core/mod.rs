pub mod alerts;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod geo;
pub mod model;
pub mod nearby;
pub mod priority;
pub mod proximity;
