pub mod analytics;
pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod input;
pub mod milestone;
pub mod output;
pub mod pacing;
pub mod window;
