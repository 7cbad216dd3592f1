//! A small feed-forward neural network engine.
//!
//! Layers are chained in a [`nn::Network`] and exchange data through a
//! per-network [`nn::Storage`] arena, addressed by [`nn::Variable`] handles.
//! On top of the engine sit a mini-batch SGD trainer ([`learner`]), seeded
//! k-fold cross-validation ([`validation`]) and decision-tree evaluation
//! ([`tree`]).

pub mod error;
pub mod learner;
pub mod nn;
pub mod optim;
pub mod tensor;
pub mod tree;
pub mod validation;

pub use error::{Error, Result};
