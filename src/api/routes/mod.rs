//! API Routes
//!
//! Route handlers organized by functionality.

pub mod admin;
pub mod api;
pub mod auth;
pub mod dashboards;
pub mod health;
pub mod permissions;
pub mod root;
