// MetabolicGuide Data
// This crate handles storage of patient records and calls to the remote store

// Database connection management
#[cfg(feature = "sqlite")]
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
