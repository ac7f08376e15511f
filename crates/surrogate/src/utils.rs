use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

/// Immutable store for one table of training data: a normalized copy of the
/// samples together with the mean and standard deviation vectors they were
/// normalized with.
///
/// Built once when an engine deck is loaded and never mutated afterwards,
/// which is what makes concurrent evaluation of a shared surrogate safe.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedData<F: Float> {
    /// normalized data
    pub data: Array2<F>,
    /// mean vector computed from data
    pub mean: Array1<F>,
    /// standard deviation vector computed from data
    pub std: Array1<F>,
}

impl<F: Float> NormalizedData<F> {
    /// Normalize `x` column-wise and retain the statistics.
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> NormalizedData<F> {
        let (data, mean, std) = normalize(x);
        NormalizedData { data, mean, std }
    }

    /// Dimension of data points
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Number of data points
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }
}

/// Center and scale `x` column-wise to zero mean and unit standard deviation
/// (one delta degree of freedom). A zero-variance column is scaled by one so
/// the transform stays defined; callers that consider constant columns an
/// error must reject them before normalizing.
pub(crate) fn normalize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let x_mean = x.mean_axis(Axis(0)).unwrap();
    let mut x_std = x.std_axis(Axis(0), F::one());
    x_std.mapv_inplace(|v| if v == F::zero() { F::one() } else { v });
    let xnorm = (x - &x_mean) / &x_std;

    (xnorm, x_mean, x_std)
}

/// Componentwise differences between a query point `x` and each row of `y`,
/// as a (nrows(y), len(x)) array.
/// *Panics* if x and y have not the same number of components
pub(crate) fn differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.len() == y.ncols());
    x.to_owned() - y
}
