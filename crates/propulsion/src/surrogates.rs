//! Output heads of an engine deck.
//!
//! Each output quantity (thrust, fuel flow, ...) is one Kriging surrogate;
//! the deck holds them behind the [`DeckSurrogate`] trait so artifacts can
//! pick their trend/kernel combination by name without changing any deck
//! code.

use crate::errors::{DeckError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use openconcept_surrogate::correlation_models::{AbsoluteExponentialCorr, SquaredExponentialCorr};
use openconcept_surrogate::mean_models::{ConstantMean, LinearMean};
use openconcept_surrogate::{CorrelationOperator, KrigingModel};
use paste::paste;
use std::fmt;

/// A trait for one output head of an engine deck.
///
/// Heads of the same deck share their sample table and length-scales, so a
/// [`CorrelationOperator`] built by any of them is valid for all of them;
/// the deck exploits this to correlate once per evaluation call.
pub trait DeckSurrogate: fmt::Display + Send + Sync {
    /// (sample count, input dimension) of the underlying training table
    fn dims(&self) -> (usize, usize);
    /// Build the correlation operator for one query point
    fn correlate(&self, x: &ArrayView1<f64>) -> Result<CorrelationOperator<f64>>;
    /// Output value and gradient from a precomputed correlation operator
    fn predict_with(&self, op: &CorrelationOperator<f64>) -> Result<(f64, Array1<f64>)>;
    /// Predict output values at n points given as a (n, nx) matrix
    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
    /// Predict output derivatives at n points given as a (n, nx) matrix
    fn predict_gradients(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>>;
}

/// A macro to declare a deck output head for a (trend, kernel) combination.
macro_rules! declare_deck_surrogate {
    ($regr:ident, $corr:ident) => {
        paste! {
            #[doc = "Engine-deck output head with `" $regr "` trend and `" $corr "` kernel."]
            pub struct [<Deck $regr $corr Surrogate>](
                pub KrigingModel<f64, [<$regr Mean>], [<$corr Corr>]>,
            );

            impl DeckSurrogate for [<Deck $regr $corr Surrogate>] {
                fn dims(&self) -> (usize, usize) {
                    (self.0.n_samples(), self.0.n_dims())
                }

                fn correlate(&self, x: &ArrayView1<f64>) -> Result<CorrelationOperator<f64>> {
                    Ok(self.0.correlate(x)?)
                }

                fn predict_with(
                    &self,
                    op: &CorrelationOperator<f64>,
                ) -> Result<(f64, Array1<f64>)> {
                    Ok(self.0.predict_with(op)?)
                }

                fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
                    Ok(self.0.predict(x)?)
                }

                fn predict_gradients(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
                    Ok(self.0.predict_gradients(x)?)
                }
            }

            impl fmt::Display for [<Deck $regr $corr Surrogate>] {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        }
    };
}

declare_deck_surrogate!(Constant, SquaredExponential);
declare_deck_surrogate!(Constant, AbsoluteExponential);
declare_deck_surrogate!(Linear, SquaredExponential);
declare_deck_surrogate!(Linear, AbsoluteExponential);

// Build one head for the given trend/kernel names.
macro_rules! make_deck_surrogate {
    ($regr:ident, $corr:ident, $theta:expr, $weights:expr, $beta:expr, $xt:expr, $yt:expr) => {
        paste! {
            Ok(Box::new([<Deck $regr $corr Surrogate>](
                KrigingModel::<f64, [<$regr Mean>], [<$corr Corr>]>::params(
                    [<$regr Mean>]::default(),
                    [<$corr Corr>]::default(),
                )
                .theta($theta)
                .weights($weights)
                .beta($beta)
                .load($xt, $yt)?,
            )) as Box<dyn DeckSurrogate>)
        }
    };
}

/// Instantiate the output head named by `trend` and `kernel` strings from a
/// deck artifact. Unknown names are a model-load failure.
pub(crate) fn build_head(
    trend: &str,
    kernel: &str,
    theta: Array1<f64>,
    weights: Array1<f64>,
    beta: Array1<f64>,
    xt: &Array2<f64>,
    yt: &Array1<f64>,
) -> Result<Box<dyn DeckSurrogate>> {
    match (trend, kernel) {
        ("Constant", "SquaredExponential") => {
            make_deck_surrogate!(Constant, SquaredExponential, theta, weights, beta, xt, yt)
        }
        ("Constant", "AbsoluteExponential") => {
            make_deck_surrogate!(Constant, AbsoluteExponential, theta, weights, beta, xt, yt)
        }
        ("Linear", "SquaredExponential") => {
            make_deck_surrogate!(Linear, SquaredExponential, theta, weights, beta, xt, yt)
        }
        ("Linear", "AbsoluteExponential") => {
            make_deck_surrogate!(Linear, AbsoluteExponential, theta, weights, beta, xt, yt)
        }
        _ => Err(DeckError::ModelLoad(format!(
            "unsupported trend/kernel combination `{trend}`/`{kernel}`"
        ))),
    }
}
