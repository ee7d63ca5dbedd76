// Library entry point for savory-bliss
// Exposes modules for testing

pub mod api;
pub mod auth;
pub mod client;
pub mod comments;
pub mod config;
pub mod error;
pub mod interactions;
pub mod media;
pub mod models;
pub mod recipes;
pub mod search;
pub mod sections;
pub mod store;
