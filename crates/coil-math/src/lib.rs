//! Mathematical primitives for Solenoid Force Core.

pub mod cache;
pub mod elliptic;
pub mod quadrature;
