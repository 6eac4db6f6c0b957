pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod routes;
pub mod state;
pub mod users;
