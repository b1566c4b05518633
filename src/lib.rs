pub mod api;
pub mod cli;
pub mod config;
pub mod era;
pub mod error;
pub mod notify;
pub mod output;
pub mod runner;
pub mod store;
