//! # Pipeline Module
//!
//! Runs one optimization cycle over the source tree.
//!
//! ## Cycle Stages
//! 1. **Scan** - Walk the source root for candidate images
//! 2. **Optimize** - Classify each candidate and bring its variants up to date
//! 3. **Report** - Fold per-asset outcomes into a [`CycleReport`]
//!
//! ## Parallelism
//! Assets are spread across a rayon pool sized by the `workers` setting.
//! Variants within one asset are encoded sequentially.

mod executor;

pub use executor::{CycleReport, Optimizer, OptimizerBuilder};
