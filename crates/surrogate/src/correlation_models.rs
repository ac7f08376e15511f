//! A module for the correlation (kernel) models of engine-deck surrogates.
//!
//! A correlation model measures the spatial similarity between a normalized
//! query point and every training sample, and exposes the exact derivative of
//! that similarity with respect to the query. The following kernels are
//! implemented:
//! * squared exponential (the engine-deck default),
//! * absolute exponential.

use crate::utils::differences;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2, Zip};
use std::fmt;

/// Lower clamp applied to correlation values.
///
/// Correlations decay double-exponentially with distance, so queries far
/// outside the training envelope drive them into the subnormal range and slow
/// down the weighted sums they feed. Values below this floor cannot influence
/// a prediction at f64 precision; raising the floor trades a little far-field
/// smoothness for arithmetic on well-behaved magnitudes.
pub const CORRELATION_FLOOR: f64 = 1e-100;

/// A trait for kernels usable as the correlation term of a Kriging surrogate.
///
/// `d` denotes componentwise query-to-sample differences as a (n, nx) array
/// and `theta` the per-dimension length-scales (nx,), strictly positive.
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync + Send {
    /// Correlation between the query and each of the n samples `d` was built
    /// against. All values lie in `(0, 1]`; a value of 1 occurs only at zero
    /// distance.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;

    /// Closed-form partial derivatives of each sample's correlation with
    /// respect to the query point `x`, as a (n, nx) array.
    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;

    /// Compute both the correlation vector and its jacobian at `x`, sharing
    /// the distance computation between the two.
    fn valjac(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> (Array1<F>, Array2<F>);
}

/// Squared exponential (Gaussian) correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    /// ```text
    ///            d
    /// r_i = exp(-Σ theta_j * d_ij^2)
    ///           j=1
    /// ```
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let floor = F::cast(CORRELATION_FLOOR);
        d.mapv(|v| v * v)
            .dot(theta)
            .mapv(|v| F::exp(-v).max(floor))
    }

    /// dr_i/dx_j = -2 theta_j * d_ij * r_i, exact at any distance
    /// (r = 1 and dr = 0 at a query coincident with a sample).
    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        self.jacobian_from(&d, &r, theta)
    }

    fn valjac(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> (Array1<F>, Array2<F>) {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        let jr = self.jacobian_from(&d, &r, theta);
        (r, jr)
    }
}

impl SquaredExponentialCorr {
    fn jacobian_from<F: Float>(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        r: &ArrayBase<impl Data<Elem = F>, Ix1>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let two = F::cast(2.);
        let mut jac = Array2::zeros((d.nrows(), d.ncols()));
        Zip::from(jac.rows_mut())
            .and(d.rows())
            .and(r)
            .for_each(|mut jac_i, d_i, r_i| {
                Zip::from(&mut jac_i)
                    .and(&d_i)
                    .and(theta)
                    .for_each(|jac_ij, d_ij, theta_j| {
                        *jac_ij = -two * *theta_j * *d_ij * *r_i;
                    });
            });
        jac
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Absolute exponential correlation model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    /// ```text
    ///            d
    /// r_i = exp(-Σ theta_j * |d_ij|)
    ///           j=1
    /// ```
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let floor = F::cast(CORRELATION_FLOOR);
        d.mapv(|v| v.abs())
            .dot(theta)
            .mapv(|v| F::exp(-v).max(floor))
    }

    /// dr_i/dx_j = -theta_j * sign(d_ij) * r_i (one-sided at d_ij = 0)
    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        self.jacobian_from(&d, &r, theta)
    }

    fn valjac(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> (Array1<F>, Array2<F>) {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        let jr = self.jacobian_from(&d, &r, theta);
        (r, jr)
    }
}

impl AbsoluteExponentialCorr {
    fn jacobian_from<F: Float>(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        r: &ArrayBase<impl Data<Elem = F>, Ix1>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let mut jac = Array2::zeros((d.nrows(), d.ncols()));
        Zip::from(jac.rows_mut())
            .and(d.rows())
            .and(r)
            .for_each(|mut jac_i, d_i, r_i| {
                Zip::from(&mut jac_i)
                    .and(&d_i)
                    .and(theta)
                    .for_each(|jac_ij, d_ij, theta_j| {
                        *jac_ij = -*theta_j * d_ij.signum() * *r_i;
                    });
            });
        jac
    }
}

impl fmt::Display for AbsoluteExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsoluteExponential")
    }
}
