// MetabolicGuide Domain
// This crate contains the business logic for the MetabolicGuide application

// Services that implement business logic
pub mod services;

// Authentication
pub mod auth;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Re-export the storage modules from the data crate for convenience
pub use metabolic_guide_data::{database, repository};

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;
