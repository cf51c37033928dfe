//! Sample annotated models for exercising the buildframe pipeline.
//!
//! The structs here compile against the `Buildable` marker derive exactly
//! the way a consuming project would. The end-to-end tests in `tests/`
//! drive the pipeline over temporary source trees instead of this crate's
//! own sources so test runs never write into the checkout.

pub mod models;
