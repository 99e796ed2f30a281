pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod ingest;
pub mod recognizer;
pub mod render;
pub mod session;
