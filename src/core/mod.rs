//! Foundation types for the strategy pipeline
//!
//! This module hides the strategy contract details:
//!
//! - [`Strategy`]: the validate/process interface every processing step
//!   implements
//! - [`StrategyOutput`]: the immutable result a strategy hands back, with
//!   its metadata contribution and optional self-check
//! - [`ErrorKind`]: the closed failure taxonomy used for classification

mod kind;
mod strategy;

pub use kind::ErrorKind;
pub use strategy::{BoxError, Metadata, Strategy, StrategyOutput};
