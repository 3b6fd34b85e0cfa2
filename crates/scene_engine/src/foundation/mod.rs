//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Weak references that report expiry instead of dangling
//! - Time management
//! - Logging utilities

pub mod math;
pub mod reference;
pub mod time;
pub mod logging;
