//! Integration module for connecting storage layers and scoring functions
//! with the walker.
//!
//! This module provides the traits the walker consumes plus an in-memory
//! source for tests and small data sets.

mod builder;
mod cost;
mod memory;
mod source;

pub use builder::DetectionBuilder;
pub use cost::{CostFunction, ScoreFn, check_batch};
pub use memory::{InMemorySource, MemorySourceError};
pub use source::CandidateSource;
