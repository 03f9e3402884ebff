//! Domain models for the clinical reference engine.

mod interpretation;
mod lab_test;
mod patient;
mod scoring;
mod unit;

pub use interpretation::*;
pub use lab_test::*;
pub use patient::*;
pub use scoring::*;
pub use unit::*;
