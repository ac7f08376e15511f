use crate::correlation_models::CorrelationModel;
use crate::mean_models::RegressionModel;
use linfa::Float;
use ndarray::Array1;

/// The offline-fitted constants of one Kriging surrogate output: kernel
/// length-scales, Kriging weights and trend coefficients.
///
/// These values are produced by the one-time training step and are loaded
/// here as opaque constants; pairing them with the training sample table via
/// [`load`](KrigingParams::load) validates their shapes and yields an
/// evaluable [`KrigingModel`](crate::KrigingModel).
///
/// Weights and trend coefficients are expressed in the normalized coordinate
/// space implied by the sample table (zero mean, unit standard deviation per
/// column), which the model re-derives at load time.
#[derive(Clone, Debug)]
pub struct KrigingParams<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> {
    /// Trend model of the fitted surrogate
    pub(crate) mean: Mean,
    /// Correlation kernel of the fitted surrogate
    pub(crate) corr: Corr,
    /// Per-dimension kernel length-scales, strictly positive
    pub(crate) theta: Array1<F>,
    /// Kriging weights, one per training sample
    pub(crate) weights: Array1<F>,
    /// Trend coefficients, one per regression basis function
    pub(crate) beta: Array1<F>,
}

impl<F: Float, Mean: RegressionModel<F>, Corr: CorrelationModel<F>> KrigingParams<F, Mean, Corr> {
    /// A constructor for Kriging parameters given trend and correlation models
    pub fn new(mean: Mean, corr: Corr) -> KrigingParams<F, Mean, Corr> {
        KrigingParams {
            mean,
            corr,
            theta: Array1::zeros(0),
            weights: Array1::zeros(0),
            beta: Array1::zeros(0),
        }
    }

    /// Set the fitted kernel length-scales
    pub fn theta(mut self, theta: Array1<F>) -> Self {
        self.theta = theta;
        self
    }

    /// Set the fitted Kriging weights
    pub fn weights(mut self, weights: Array1<F>) -> Self {
        self.weights = weights;
        self
    }

    /// Set the fitted trend coefficients
    pub fn beta(mut self, beta: Array1<F>) -> Self {
        self.beta = beta;
        self
    }
}
