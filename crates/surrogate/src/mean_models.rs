//! A module for the trend (mean) term of engine-deck surrogates.
//!
//! Engine decks are fitted with a low-order polynomial trend; the Kriging
//! term then models the correlated residual. Constant and linear trends are
//! implemented, matching the bases the offline fitting step produces
//! coefficients for.

use linfa::Float;
use ndarray::{concatenate, s, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;

/// A trait for trend models used as the mean term of a Kriging surrogate
pub trait RegressionModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync + Send {
    /// Evaluate the regression basis at the given `x` data points specified
    /// as a (n, nx) matrix, returning a (n, basis-size) matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Derivatives of the regression basis at the given `x` data point
    /// specified as a (nx,) vector, returning a (basis-size, nx) matrix.
    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F>;
}

/// A constant trend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantMean();

impl<F: Float> RegressionModel<F> for ConstantMean {
    /// regr(x) = [1, ..., 1].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::<F>::ones((x.nrows(), 1))
    }

    /// regr.jac(x) = [0, ..., 0], a (1, nx) matrix
    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F> {
        Array2::<F>::zeros((1, x.len()))
    }
}

impl fmt::Display for ConstantMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConstantMean")
    }
}

/// An affine trend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearMean();

impl<F: Float> RegressionModel<F> for LinearMean {
    /// regr(x) = [ 1, x_1, ..., x_n ].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()]
    }

    /// regr.jac(x) = [0, ... , 0
    ///                   I(nx)  ]
    /// a (nx+1, nx) matrix where nx is the dimension of x
    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F> {
        let nx = x.len();
        let mut jac = Array2::<F>::zeros((nx + 1, nx));
        jac.slice_mut(s![1.., ..]).assign(&Array2::eye(nx));
        jac
    }
}

impl fmt::Display for LinearMean {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LinearMean")
    }
}
