//! Modules layer - Infrastructure components for external integrations
//!
//! Contains persistence backends shared by the feature stores.

pub mod storage;
