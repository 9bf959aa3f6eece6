//! Operator-facing API.

pub mod challenge;
pub mod health;
