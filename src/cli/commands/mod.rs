pub mod config;
pub mod run;
pub mod scrape;
pub mod search;
