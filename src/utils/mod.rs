//! Shared utilities for the layers and the network
//!
//! Random number generation, activation and cost functions, weight
//! initialisers, and the padding/indexing helpers used by the spatial layers.

pub mod activations;
pub mod cost;
pub mod geometry;
pub mod init;
pub mod rng;
