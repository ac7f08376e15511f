use crate::correlation_models::CorrelationModel;
use crate::errors::{Result, SurrogateError};
use crate::mean_models::RegressionModel;
use crate::parameters::KrigingParams;
use crate::utils::{differences, NormalizedData};

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use std::fmt;

/// The per-query correlation computation shared by every output of an engine
/// deck: the normalized query point, its correlation vector against the
/// training samples and the jacobian of that vector.
///
/// Built once per evaluation call by [`KrigingModel::correlate`] and passed
/// to each per-output predictor within that call; a plain short-lived value,
/// never cached between calls.
#[derive(Debug, Clone)]
pub struct CorrelationOperator<F: Float> {
    xnorm: Array1<F>,
    r: Array1<F>,
    dr: Array2<F>,
}

impl<F: Float> CorrelationOperator<F> {
    /// Number of training samples the operator was built against
    pub fn n_samples(&self) -> usize {
        self.r.len()
    }
}

/// An evaluator for one output quantity of an engine deck, interpolating a
/// Kriging (Gaussian-process) surrogate fitted offline to tabulated data.
///
/// The interpolated output is modeled as:
///
/// `Y(x) = f(x).beta + r(x).gamma`
///
/// where:
/// * `f(x)` is the trend basis evaluated at the normalized query,
/// * `beta` the fitted trend coefficients,
/// * `r(x)` the correlation of the query to every training sample,
/// * `gamma` the fitted Kriging weights.
///
/// All fitted constants arrive from the offline training step through
/// [`KrigingParams`]; nothing is estimated at runtime. Evaluation is pure:
/// identical queries yield identical values and gradients, and a constructed
/// model may be shared freely across threads.
///
/// Gradients are exact closed-form derivatives of the predictor, chain-ruled
/// through the input/output normalization; they are what a Newton-based
/// multidisciplinary solver consumes, so no finite differencing is involved
/// anywhere.
///
/// Queries outside the training envelope are *not* rejected: the predictor
/// stays smooth and well-defined under extrapolation, which gradient-based
/// optimizers rely on during line searches, but predictions there carry no
/// fitted-error guarantee. Envelope policing is the caller's concern (the
/// engine-deck façade flags such queries).
#[derive(Debug, Clone)]
pub struct KrigingModel<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Per-dimension kernel length-scales
    theta: Array1<F>,
    /// Kriging weights, one per training sample
    weights: Array1<F>,
    /// Trend coefficients
    beta: Array1<F>,
    /// Normalized training inputs
    xt_norm: NormalizedData<F>,
    /// Normalized training output
    yt_norm: NormalizedData<F>,
    /// Trend model
    mean: Mean,
    /// Correlation kernel
    corr: Corr,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for KrigingModel<F, Mean, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Kriging(mean={}, corr={}, theta={})",
            self.mean, self.corr, self.theta
        )
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> KrigingModel<F, Mean, Corr> {
    /// Kriging parameters constructor
    pub fn params(mean: Mean, corr: Corr) -> KrigingParams<F, Mean, Corr> {
        KrigingParams::new(mean, corr)
    }

    /// Number of training samples
    pub fn n_samples(&self) -> usize {
        self.xt_norm.nrows()
    }

    /// Input dimension
    pub fn n_dims(&self) -> usize {
        self.xt_norm.ncols()
    }

    /// Fitted kernel length-scales
    pub fn theta(&self) -> &Array1<F> {
        &self.theta
    }

    /// Predict output values at n given `x` points of nx components specified
    /// as a (n, nx) matrix. Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_dims(x.ncols())?;
        let xnorm = (x - &self.xt_norm.mean) / &self.xt_norm.std;
        // Trend term at x
        let f = self.mean.value(&xnorm);
        let mut y = f.dot(&self.beta);
        // Correlation term at x
        Zip::from(&mut y).and(xnorm.rows()).for_each(|y_i, xnorm_i| {
            let d = differences(&xnorm_i, &self.xt_norm.data);
            let r = self.corr.value(&d, &self.theta);
            *y_i += r.dot(&self.weights);
        });
        // Denormalized predictor
        Ok(y.mapv(|v| v * self.yt_norm.std[0] + self.yt_norm.mean[0]))
    }

    /// Predict output derivatives at n given `x` points specified as a
    /// (n, nx) matrix. Returns a (n, nx) matrix of partial derivatives of the
    /// prediction with respect to each input component, in raw (denormalized)
    /// units.
    pub fn predict_gradients(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_dims(x.ncols())?;
        let xnorm = (x - &self.xt_norm.mean) / &self.xt_norm.std;
        let mut jac = Array2::zeros((x.nrows(), x.ncols()));
        Zip::from(jac.rows_mut())
            .and(xnorm.rows())
            .for_each(|mut jac_i, xnorm_i| {
                let dr = self.corr.jacobian(&xnorm_i, &self.xt_norm.data, &self.theta);
                jac_i.assign(&self.gradient_from(&xnorm_i, &dr));
            });
        Ok(jac)
    }

    /// Compute the correlation operator for one query point `x` of nx
    /// components. The operator can be shared by every surrogate fitted on
    /// the same sample table and length-scales, which is how an engine deck
    /// evaluates all of its outputs with a single correlation pass.
    pub fn correlate(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<CorrelationOperator<F>> {
        self.check_dims(x.len())?;
        let xnorm = (x.to_owned() - &self.xt_norm.mean) / &self.xt_norm.std;
        let (r, dr) = self.corr.valjac(&xnorm, &self.xt_norm.data, &self.theta);
        Ok(CorrelationOperator { xnorm, r, dr })
    }

    /// Predict the output value and its gradient from a precomputed
    /// [`CorrelationOperator`], denormalized consistently with
    /// [`predict`](KrigingModel::predict) and
    /// [`predict_gradients`](KrigingModel::predict_gradients).
    pub fn predict_with(&self, op: &CorrelationOperator<F>) -> Result<(F, Array1<F>)> {
        if op.n_samples() != self.n_samples() {
            return Err(SurrogateError::DataShape(format!(
                "correlation operator built against {} samples, model holds {}",
                op.n_samples(),
                self.n_samples()
            )));
        }
        let f = self.mean.value(&op.xnorm.view().insert_axis(Axis(0)));
        let y = f.row(0).dot(&self.beta) + op.r.dot(&self.weights);
        let value = y * self.yt_norm.std[0] + self.yt_norm.mean[0];
        let gradient = self.gradient_from(&op.xnorm, &op.dr);
        Ok((value, gradient))
    }

    /// Gradient of the denormalized prediction at a normalized query, given
    /// the correlation jacobian at that query. The normalization chain rule
    /// scales each component by `y_std / x_std_k`.
    fn gradient_from(
        &self,
        xnorm: &ArrayBase<impl Data<Elem = F>, Ix1>,
        dr: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array1<F> {
        let df = self.mean.jacobian(xnorm);
        let g = df.t().dot(&self.beta) + dr.t().dot(&self.weights);
        let y_std = self.yt_norm.std[0];
        g.mapv(|v| v * y_std) / &self.xt_norm.std
    }

    fn check_dims(&self, nx: usize) -> Result<()> {
        if nx != self.n_dims() {
            return Err(SurrogateError::DataShape(format!(
                "query has {} components, model expects {}",
                nx,
                self.n_dims()
            )));
        }
        Ok(())
    }
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> KrigingParams<F, Mean, Corr> {
    /// Pair the fitted constants with their training sample table, given as
    /// inputs `xt` (n, nx) and observed output `yt` (n,), and build the
    /// evaluable model.
    ///
    /// Fails with [`SurrogateError::DataShape`] when the tables disagree on
    /// sample count or dimensionality, and with
    /// [`SurrogateError::InvalidValue`] when a length-scale is not strictly
    /// positive.
    pub fn load(
        self,
        xt: &ArrayBase<impl Data<Elem = F>, Ix2>,
        yt: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<KrigingModel<F, Mean, Corr>> {
        let (n_samples, n_dims) = (xt.nrows(), xt.ncols());
        if n_samples == 0 {
            return Err(SurrogateError::DataShape(
                "empty training sample table".to_string(),
            ));
        }
        if yt.len() != n_samples {
            return Err(SurrogateError::DataShape(format!(
                "output count ({}) does not match sample count ({})",
                yt.len(),
                n_samples
            )));
        }
        if self.theta.len() != n_dims {
            return Err(SurrogateError::DataShape(format!(
                "{} length-scales for {} input dimensions",
                self.theta.len(),
                n_dims
            )));
        }
        if self.theta.iter().any(|t| *t <= F::zero()) {
            return Err(SurrogateError::InvalidValue(format!(
                "length-scales must be strictly positive, got {}",
                self.theta
            )));
        }
        if self.weights.len() != n_samples {
            return Err(SurrogateError::DataShape(format!(
                "{} Kriging weights for {} training samples",
                self.weights.len(),
                n_samples
            )));
        }
        let n_basis = self.mean.value(&Array2::<F>::zeros((1, n_dims))).ncols();
        if self.beta.len() != n_basis {
            return Err(SurrogateError::DataShape(format!(
                "{} trend coefficients for a {} basis of size {}",
                self.beta.len(),
                self.mean,
                n_basis
            )));
        }

        let xt_norm = NormalizedData::new(xt);
        let yt_norm = NormalizedData::new(&yt.to_owned().insert_axis(Axis(1)));
        Ok(KrigingModel {
            theta: self.theta,
            weights: self.weights,
            beta: self.beta,
            xt_norm,
            yt_norm,
            mean: self.mean,
            corr: self.corr,
        })
    }
}
