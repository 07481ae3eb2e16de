pub mod browser;
pub mod config;
pub mod db;
pub mod downloads;
pub mod errors;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod services;
pub mod utils;
