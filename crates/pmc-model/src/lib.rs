//! A library to represent probabilistic models
//!
//! This crate contains the types used to represent explicit probabilistic
//! models and PRISM programs. In particular, it contains:
//! - [`models::SparseModel`]: common interface of sparse models, implemented
//!   by [`models::SparseDtmc`], [`models::SparseMdp`] and the tagged
//!   [`models::Model`]
//! - [`builder::ModelBuilder`]: validates raw transitions and selects the
//!   representation matching the number of choices per state
//! - [`program::Program`]: structured PRISM program, built with the
//!   [`program::ProgramBuilder`]
//!
//! Transition probabilities are either concrete numbers or expressions over
//! undefined constants (see [`probability::Probability`]), in the latter case
//! the model is parametric.

pub mod builder;
pub mod expressions;
pub mod labeling;
pub mod models;
pub mod probability;
pub mod program;
pub mod sparse_matrix;

#[cfg(feature = "dot")]
pub mod dot;

pub use models::{Model, ModelType, SparseModel};
