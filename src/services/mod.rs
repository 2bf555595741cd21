//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic, permission checks, and cascade rules
//! so route handlers can stay focused on protocol translation and auth
//! plumbing. Each service locks the stores it needs, validates, mutates,
//! and releases.

pub mod action;
pub mod auth;
pub mod member;
pub mod module;
pub mod project;
pub mod seed;
pub mod session;
