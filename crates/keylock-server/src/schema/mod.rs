//! API schema types for response bodies.

pub mod health;
pub mod locks;
