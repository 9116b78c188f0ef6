pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routines;
pub mod state;
