//! # cm-core
//!
//! Core types and configuration for ClaimDesk RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The primary key type shared by every persisted record
//! - Process configuration loaded once at startup

pub mod config;

pub use config::{AppConfig, ConfigError, Environment};

/// Primary key type for persisted records
pub type Id = i64;
