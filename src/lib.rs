// src/lib.rs

pub mod analysis;
pub mod config;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod remote;
pub mod routes;
pub mod state;
pub mod store;

pub use routes::create_router;
