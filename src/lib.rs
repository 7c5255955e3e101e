//! Stock Trader Churn Scoring Library
//!
//! Collects a customer's trading profile from a web form, forwards it to a remote
//! churn-prediction endpoint and renders the returned risk classification.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Customer record and scoring result models.
//! - `payload`: Field renaming table and wire payload construction.
//! - `scoring_client`: Scoring endpoint client.
//! - `scoring_models`: Scoring response schemas and parsing.
//! - `views`: HTML pages.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod scoring_client;
pub mod scoring_models;
pub mod views;
