//! Engine-deck surrogate models for conceptual aircraft propulsion analysis.
//!
//! An engine deck tabulates the performance of a specific engine across
//! operating conditions (altitude, Mach number, throttle) and is fitted
//! offline into one Kriging surrogate per output quantity (net thrust, fuel
//! flow, and for hybrid-electric variants an electric load). This crate
//! loads those fitted artifacts and exposes them as [`EngineDeck`]: one call
//! per operating point returns every output together with the exact jacobian
//! the surrounding Newton-based multidisciplinary solver needs.
//!
//! All outputs of a deck share their sample table and kernel length-scales,
//! so one evaluation computes the correlation term once and reuses it across
//! outputs. Decks are immutable after construction and may be evaluated
//! concurrently without locking; [`EngineDeck::evaluate_batch`] does exactly
//! that over a batch of operating points.
//!
//! Three fitted decks are packaged with the crate: `cfm56`, `n3` and
//! `n3_hybrid`.
//!
//! # Example
//!
//! ```no_run
//! use ndarray::array;
//! use openconcept_propulsion::EngineDeck;
//!
//! let deck = EngineDeck::packaged("n3").expect("deck loaded");
//! // altitude (ft), Mach, throttle
//! let ev = deck.evaluate(&array![15000., 0.55, 0.8]).expect("deck evaluated");
//! println!("thrust = {} N", ev.outputs["thrust"]);
//! println!("d(thrust)/d(altitude) = {}", ev.jacobian["thrust"][0]);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod deck;
mod errors;
mod file_format;
pub mod surrogates;

pub use deck::{DeckConfig, EngineDeck, Evaluation};
pub use errors::*;
pub use file_format::{DeckFile, DeckOutput};
