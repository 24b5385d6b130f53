//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own session access and business rules so route handlers
//! can stay focused on protocol translation.

pub mod canvas;
pub mod generation;
