//! API handlers module

pub mod dispersion;
pub mod health;
