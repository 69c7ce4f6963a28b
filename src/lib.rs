pub mod align;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod output;
pub mod records;
pub mod report;
pub mod summary;
pub mod timestamp;
