//! Utility functions

pub mod rand;
