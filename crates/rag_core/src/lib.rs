pub mod artifacts;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod vectordb;
