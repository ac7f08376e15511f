//! Wing planform geometry relations with analytic partial derivatives for
//! conceptual aircraft design.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod wing_planform;

pub use wing_planform::*;
