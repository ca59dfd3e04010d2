pub mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod shutdown;
pub mod startup;
pub mod store;
pub mod utils;
pub mod web;
