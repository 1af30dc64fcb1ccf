pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod report;
pub mod store;
