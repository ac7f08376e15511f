//! The engine-deck surrogate façade.
//!
//! An [`EngineDeck`] bundles one Kriging surrogate per output quantity of a
//! named engine and evaluates them all in a single pass: the correlation
//! vector and its jacobian are computed once per query and shared across
//! outputs, which is sound because every output of a deck is fitted on the
//! same sample table and length-scales (the artifact format makes this
//! structural).

use crate::errors::{DeckError, Result};
use crate::file_format::DeckFile;
use crate::surrogates::{build_head, DeckSurrogate};

use log::{debug, warn};
use ndarray::{aview1, Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use ndarray_stats::QuantileExt;
use openconcept_surrogate::SurrogateError;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Evaluation-time configuration of an engine deck.
#[derive(Debug, Clone, Copy)]
pub struct DeckConfig {
    /// Fraction of each input dimension's training span by which the
    /// envelope is stretched before a query is flagged as out of domain.
    pub margin: f64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        DeckConfig { margin: 0.05 }
    }
}

/// The result of evaluating one operating point: every output value, the
/// full jacobian, and the out-of-domain flag. Valid only for the query that
/// produced it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Output values keyed by output name, in raw units
    pub outputs: HashMap<String, f64>,
    /// Partial derivatives of each output with respect to each input
    /// dimension (in the deck's input order), keyed by output name
    pub jacobian: HashMap<String, Array1<f64>>,
    /// Names of the input dimensions on which the query left the
    /// margin-stretched training envelope; empty when the query is interior.
    /// The prediction is returned either way: extrapolation is permitted but
    /// carries no fitted-error guarantee, and the calling solver decides
    /// whether to proceed or clip.
    pub out_of_domain: Vec<String>,
}

impl Evaluation {
    /// Whether the query left the training envelope on any input dimension
    pub fn is_out_of_domain(&self) -> bool {
        !self.out_of_domain.is_empty()
    }
}

/// A named engine deck: one Kriging surrogate per output quantity over a
/// shared training sample table.
///
/// Decks are constructed once from a packaged artifact and are read-only
/// afterwards, so a single instance may be evaluated concurrently from any
/// number of threads without locking.
pub struct EngineDeck {
    name: String,
    description: String,
    inputs: Vec<String>,
    units: Vec<String>,
    output_names: Vec<String>,
    output_units: Vec<String>,
    heads: Vec<Box<dyn DeckSurrogate>>,
    /// Per-dimension training envelope, raw units
    lower: Array1<f64>,
    upper: Array1<f64>,
    config: DeckConfig,
}

impl fmt::Display for EngineDeck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EngineDeck({}: {} over {}, {} samples)",
            self.name,
            self.output_names.join(", "),
            self.inputs.join(", "),
            self.n_samples(),
        )
    }
}

impl EngineDeck {
    /// Load an engine deck from a packaged artifact file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<EngineDeck> {
        let path = path.as_ref();
        let start = Instant::now();
        let data = fs::read(path).map_err(|err| {
            DeckError::ModelLoad(format!(
                "cannot read engine deck `{}`: {err}",
                path.display()
            ))
        })?;
        let file: DeckFile = serde_json::from_slice(&data).map_err(|err| {
            DeckError::ModelLoad(format!(
                "malformed engine deck `{}`: {err}",
                path.display()
            ))
        })?;
        let deck = Self::from_deck_file(file)?;
        debug!("loaded engine deck `{}` in {:?}", deck.name, start.elapsed());
        Ok(deck)
    }

    /// Construct the deck named `name` from `<dir>/<name>.json`. This is the
    /// `construct(engineName)` entry point propulsion components build decks
    /// through.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> Result<EngineDeck> {
        let path = dir.as_ref().join(format!("{name}.json"));
        if !path.is_file() {
            return Err(DeckError::ModelLoad(format!(
                "no engine deck named `{name}` under `{}`",
                dir.as_ref().display()
            )));
        }
        Self::from_file(path)
    }

    /// Construct one of the decks packaged with this crate (`cfm56`, `n3`,
    /// `n3_hybrid`). Resolves relative to the crate source tree; deployments
    /// shipping their own decks should use [`open`](EngineDeck::open).
    pub fn packaged(name: &str) -> Result<EngineDeck> {
        Self::open(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"), name)
    }

    /// Build a deck from an already-parsed artifact. All consistency
    /// validation lives here.
    pub fn from_deck_file(file: DeckFile) -> Result<EngineDeck> {
        let nx = file.inputs.len();
        if nx == 0 {
            return Err(SurrogateError::DataShape(
                "engine deck declares no input dimensions".to_string(),
            )
            .into());
        }
        if file.units.len() != nx {
            return Err(SurrogateError::DataShape(format!(
                "{} input units for {} input dimensions",
                file.units.len(),
                nx
            ))
            .into());
        }
        let ns = file.samples.len();
        if ns == 0 {
            return Err(
                SurrogateError::DataShape("empty training sample table".to_string()).into(),
            );
        }

        let mut xt = Array2::zeros((ns, nx));
        for (i, row) in file.samples.iter().enumerate() {
            if row.len() != nx {
                return Err(SurrogateError::DataShape(format!(
                    "sample row {i} has {} coordinates, deck declares {nx} inputs",
                    row.len()
                ))
                .into());
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(SurrogateError::DataShape(format!(
                    "non-finite coordinate in sample row {i}"
                ))
                .into());
            }
            xt.row_mut(i).assign(&aview1(row));
        }
        if file.theta.iter().any(|v| !v.is_finite()) {
            return Err(
                SurrogateError::DataShape("non-finite length-scale".to_string()).into(),
            );
        }

        let mut lower = Array1::zeros(nx);
        let mut upper = Array1::zeros(nx);
        for (k, name) in file.inputs.iter().enumerate() {
            let col = xt.column(k);
            let lo = *col.min().unwrap();
            let hi = *col.max().unwrap();
            if lo == hi {
                return Err(SurrogateError::DataShape(format!(
                    "input `{name}` is constant across the sample table"
                ))
                .into());
            }
            lower[k] = lo;
            upper[k] = hi;
        }

        let mut duplicates = 0;
        for i in 0..ns {
            for j in (i + 1)..ns {
                if xt.row(i) == xt.row(j) {
                    duplicates += 1;
                }
            }
        }
        if duplicates > 0 {
            warn!(
                "engine deck `{}`: {duplicates} duplicate sample rows in the training table",
                file.name
            );
        }

        if file.outputs.is_empty() {
            return Err(SurrogateError::DataShape(format!(
                "engine deck `{}` declares no outputs",
                file.name
            ))
            .into());
        }
        let mut seen = HashSet::new();
        for out in &file.outputs {
            if !seen.insert(out.name.as_str()) {
                return Err(SurrogateError::DataShape(format!(
                    "duplicate output name `{}`",
                    out.name
                ))
                .into());
            }
        }

        let theta = Array1::from(file.theta.clone());
        let mut heads: Vec<Box<dyn DeckSurrogate>> = Vec::with_capacity(file.outputs.len());
        let mut output_names = Vec::with_capacity(file.outputs.len());
        let mut output_units = Vec::with_capacity(file.outputs.len());
        for out in &file.outputs {
            if out
                .values
                .iter()
                .chain(&out.weights)
                .chain(&out.beta)
                .any(|v| !v.is_finite())
            {
                return Err(SurrogateError::DataShape(format!(
                    "non-finite fitted constant in output `{}`",
                    out.name
                ))
                .into());
            }
            let yt = Array1::from(out.values.clone());
            let weights = Array1::from(out.weights.clone());
            let beta = Array1::from(out.beta.clone());
            heads.push(build_head(
                &file.trend,
                &file.kernel,
                theta.clone(),
                weights,
                beta,
                &xt,
                &yt,
            )?);
            output_names.push(out.name.clone());
            output_units.push(out.units.clone());
        }

        Ok(EngineDeck {
            name: file.name,
            description: file.description,
            inputs: file.inputs,
            units: file.units,
            output_names,
            output_units,
            heads,
            lower,
            upper,
            config: DeckConfig::default(),
        })
    }

    /// Replace the evaluation-time configuration
    pub fn with_config(mut self, config: DeckConfig) -> Self {
        self.config = config;
        self
    }

    /// Engine name the deck is keyed by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description of the deck
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Input dimension names, in query order
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Units of each input dimension
    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Output names, in artifact order
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Units of each output
    pub fn output_units(&self) -> &[String] {
        &self.output_units
    }

    /// Number of training samples in the deck's table
    pub fn n_samples(&self) -> usize {
        self.heads[0].dims().0
    }

    /// Per-dimension training envelope (lower, upper), raw units
    pub fn envelope(&self) -> (&Array1<f64>, &Array1<f64>) {
        (&self.lower, &self.upper)
    }

    /// Evaluate every output and the full jacobian at one operating point,
    /// given in the deck's input order.
    ///
    /// The correlation vector and its jacobian are computed once and shared
    /// by all outputs. A query outside the margin-stretched training
    /// envelope is logged and flagged on the result, never rejected.
    ///
    /// *Panics* if the operating point does not have one component per deck
    /// input.
    pub fn evaluate(&self, point: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<Evaluation> {
        assert_eq!(
            point.len(),
            self.inputs.len(),
            "operating point has {} components, deck `{}` expects {}",
            point.len(),
            self.name,
            self.inputs.len()
        );
        let out_of_domain = self.domain_violations(point);
        if !out_of_domain.is_empty() {
            warn!(
                "engine deck `{}`: query outside training envelope on {:?}",
                self.name, out_of_domain
            );
        }

        let op = self.heads[0].correlate(&point.view())?;
        let mut outputs = HashMap::with_capacity(self.heads.len());
        let mut jacobian = HashMap::with_capacity(self.heads.len());
        for (name, head) in self.output_names.iter().zip(&self.heads) {
            let (value, gradient) = head.predict_with(&op)?;
            outputs.insert(name.clone(), value);
            jacobian.insert(name.clone(), gradient);
        }
        Ok(Evaluation {
            outputs,
            jacobian,
            out_of_domain,
        })
    }

    /// Evaluate an operating point given as a name/value map keyed by the
    /// deck's input names.
    pub fn evaluate_named(&self, point: &HashMap<String, f64>) -> Result<Evaluation> {
        let mut x = Array1::zeros(self.inputs.len());
        for (k, name) in self.inputs.iter().enumerate() {
            x[k] = *point
                .get(name)
                .ok_or_else(|| DeckError::MissingInput(name.clone()))?;
        }
        self.evaluate(&x)
    }

    /// Evaluate a batch of operating points given as a (n, nx) matrix, in
    /// parallel. Individual evaluations need no coordination, so this is a
    /// plain per-row map.
    pub fn evaluate_batch(
        &self,
        points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    ) -> Result<Vec<Evaluation>> {
        let rows: Vec<_> = points.rows().into_iter().collect();
        rows.into_par_iter().map(|row| self.evaluate(&row)).collect()
    }

    fn domain_violations(&self, point: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Vec<String> {
        let mut violated = Vec::new();
        for (k, name) in self.inputs.iter().enumerate() {
            let slack = self.config.margin * (self.upper[k] - self.lower[k]);
            if point[k] < self.lower[k] - slack || point[k] > self.upper[k] + slack {
                violated.push(name.clone());
            }
        }
        violated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_format::DeckOutput;
    use approx::assert_abs_diff_eq;
    use linfa_linalg::cholesky::*;
    use linfa_linalg::triangular::*;
    use ndarray::{array, Axis};

    /// Reference constant-trend Kriging fit in the normalized space of
    /// (xt, yt), mirroring the offline trainer that produces deck artifacts.
    fn fit_constant(
        xt: &Array2<f64>,
        yt: &Array1<f64>,
        theta: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let ns = xt.nrows();
        let x_mean = xt.mean_axis(Axis(0)).unwrap();
        let mut x_std = xt.std_axis(Axis(0), 1.);
        x_std.mapv_inplace(|v| if v == 0. { 1. } else { v });
        let xn = (xt - &x_mean) / &x_std;
        let y_mean = yt.mean().unwrap();
        let y_std = {
            let s = yt.to_owned().insert_axis(Axis(1)).std_axis(Axis(0), 1.)[0];
            if s == 0. {
                1.
            } else {
                s
            }
        };
        let yn = yt.mapv(|v| (v - y_mean) / y_std).insert_axis(Axis(1));

        let mut r_mx = Array2::<f64>::eye(ns).mapv(|v| v + v * 1e-10);
        for i in 0..ns {
            for j in 0..ns {
                if i != j {
                    let mut s = 0.;
                    for k in 0..xt.ncols() {
                        let d = xn[[i, k]] - xn[[j, k]];
                        s += theta[k] * d * d;
                    }
                    r_mx[[i, j]] = (-s).exp();
                }
            }
        }
        let r_chol = r_mx.cholesky().unwrap();
        let ones = Array2::<f64>::ones((ns, 1));
        let ft = r_chol.solve_triangular(&ones, UPLO::Lower).unwrap();
        let yt_ = r_chol.solve_triangular(&yn, UPLO::Lower).unwrap();
        let beta = (ft.t().dot(&yt_) / ft.t().dot(&ft))[[0, 0]];
        let rho = yt_ - ft.mapv(|v| v * beta);
        let weights = r_chol.t().solve_triangular(&rho, UPLO::Upper).unwrap();
        (array![beta], weights.column(0).to_owned())
    }

    /// The 4-point altitude/Mach thrust table used as a sanity scenario.
    fn toy_thrust_deck() -> DeckFile {
        let xt = array![[0., 0.2], [10000., 0.2], [0., 0.8], [10000., 0.8]];
        let yt = array![10000., 8000., 9000., 7200.];
        let theta = array![0.5, 0.5];
        let (beta, weights) = fit_constant(&xt, &yt, &theta);
        DeckFile {
            name: "toy".to_string(),
            description: "4-point thrust table".to_string(),
            inputs: vec!["altitude".to_string(), "mach".to_string()],
            units: vec!["ft".to_string(), String::new()],
            kernel: "SquaredExponential".to_string(),
            trend: "Constant".to_string(),
            theta: theta.to_vec(),
            samples: xt.rows().into_iter().map(|r| r.to_vec()).collect(),
            outputs: vec![DeckOutput {
                name: "thrust".to_string(),
                units: "N".to_string(),
                values: yt.to_vec(),
                weights: weights.to_vec(),
                beta: beta.to_vec(),
            }],
        }
    }

    #[test]
    fn test_toy_deck_interpolates_and_descends_with_altitude() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        // recover the table at its own support points
        for (point, expected) in [
            (array![0., 0.2], 10000.),
            (array![10000., 0.2], 8000.),
            (array![0., 0.8], 9000.),
            (array![10000., 0.8], 7200.),
        ] {
            let ev = deck.evaluate(&point).unwrap();
            assert_abs_diff_eq!(ev.outputs["thrust"], expected, epsilon = 1e-4);
        }
        // interior query stays strictly inside the training output range
        let ev = deck.evaluate(&array![5000., 0.5]).unwrap();
        let thrust = ev.outputs["thrust"];
        assert!(thrust > 7200. && thrust < 10000., "thrust = {thrust}");
        // thrust decreases with altitude in this table
        assert!(ev.jacobian["thrust"][0] < 0.);
        assert!(!ev.is_out_of_domain());
    }

    #[test]
    fn test_toy_deck_jacobian_matches_central_differences() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        let (alt, mach) = (5000., 0.5);
        let ev = deck.evaluate(&array![alt, mach]).unwrap();
        let steps = [1., 1e-4];
        for k in 0..2 {
            let mut p = array![alt, mach];
            let mut m = array![alt, mach];
            p[k] += steps[k];
            m[k] -= steps[k];
            let fp = deck.evaluate(&p).unwrap().outputs["thrust"];
            let fm = deck.evaluate(&m).unwrap().outputs["thrust"];
            let fdiff = (fp - fm) / (2. * steps[k]);
            let analytic = ev.jacobian["thrust"][k];
            let rel = (analytic - fdiff).abs() / fdiff.abs();
            assert!(rel < 1e-4, "dim {k}: analytic {analytic}, fdiff {fdiff}");
        }
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        let ev1 = deck.evaluate(&array![3000., 0.4]).unwrap();
        let ev2 = deck.evaluate(&array![3000., 0.4]).unwrap();
        assert_eq!(ev1.outputs["thrust"], ev2.outputs["thrust"]);
        assert_eq!(ev1.jacobian["thrust"], ev2.jacobian["thrust"]);
    }

    #[test]
    fn test_out_of_domain_flag() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        // well outside the 5% stretched altitude envelope, still answers
        let ev = deck.evaluate(&array![30000., 0.5]).unwrap();
        assert_eq!(ev.out_of_domain, vec!["altitude".to_string()]);
        assert!(ev.outputs["thrust"].is_finite());
        // just inside the stretched envelope
        let ev = deck.evaluate(&array![10400., 0.5]).unwrap();
        assert!(!ev.is_out_of_domain());
        // wider margin accepts more
        let deck = deck.with_config(DeckConfig { margin: 3. });
        let ev = deck.evaluate(&array![30000., 0.5]).unwrap();
        assert!(!ev.is_out_of_domain());
    }

    #[test]
    fn test_evaluate_named_and_missing_input() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        let mut point = HashMap::new();
        point.insert("altitude".to_string(), 5000.);
        point.insert("mach".to_string(), 0.5);
        let ev = deck.evaluate_named(&point).unwrap();
        let direct = deck.evaluate(&array![5000., 0.5]).unwrap();
        assert_eq!(ev.outputs["thrust"], direct.outputs["thrust"]);

        point.remove("mach");
        assert!(matches!(
            deck.evaluate_named(&point),
            Err(DeckError::MissingInput(name)) if name == "mach"
        ));
    }

    #[test]
    fn test_evaluate_batch_matches_single_calls() {
        let deck = EngineDeck::from_deck_file(toy_thrust_deck()).unwrap();
        let points = array![[0., 0.2], [2500., 0.3], [5000., 0.5], [9000., 0.75]];
        let batch = deck.evaluate_batch(&points).unwrap();
        assert_eq!(batch.len(), 4);
        for (ev, row) in batch.iter().zip(points.rows()) {
            let single = deck.evaluate(&row).unwrap();
            assert_eq!(ev.outputs["thrust"], single.outputs["thrust"]);
            assert_eq!(ev.jacobian["thrust"], single.jacobian["thrust"]);
        }
    }

    #[test]
    fn test_mismatched_tables_rejected() {
        let mut file = toy_thrust_deck();
        file.outputs[0].values.pop();
        assert!(matches!(
            EngineDeck::from_deck_file(file),
            Err(DeckError::Surrogate(SurrogateError::DataShape(_)))
        ));

        let mut file = toy_thrust_deck();
        file.outputs[0].weights.pop();
        assert!(matches!(
            EngineDeck::from_deck_file(file),
            Err(DeckError::Surrogate(SurrogateError::DataShape(_)))
        ));

        let mut file = toy_thrust_deck();
        file.samples[2] = vec![0.];
        assert!(matches!(
            EngineDeck::from_deck_file(file),
            Err(DeckError::Surrogate(SurrogateError::DataShape(_)))
        ));
    }

    #[test]
    fn test_constant_input_dimension_rejected() {
        let mut file = toy_thrust_deck();
        for row in &mut file.samples {
            row[1] = 0.5;
        }
        assert!(matches!(
            EngineDeck::from_deck_file(file),
            Err(DeckError::Surrogate(SurrogateError::DataShape(_)))
        ));
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let mut file = toy_thrust_deck();
        file.kernel = "Matern52".to_string();
        assert!(matches!(
            EngineDeck::from_deck_file(file),
            Err(DeckError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(matches!(
            EngineDeck::packaged("rocket"),
            Err(DeckError::ModelLoad(_))
        ));
        assert!(matches!(
            EngineDeck::from_file("no/such/deck.json"),
            Err(DeckError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_packaged_decks_interpolate_their_tables() {
        for name in ["cfm56", "n3", "n3_hybrid"] {
            let deck = EngineDeck::packaged(name).unwrap();
            assert_eq!(deck.name(), name);
            assert_eq!(deck.inputs(), ["altitude", "mach", "throttle"]);

            // interpolation property at a few support points of every output
            let path = Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("data")
                .join(format!("{name}.json"));
            let file: DeckFile =
                serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
            for i in [0, file.samples.len() / 2, file.samples.len() - 1] {
                let ev = deck.evaluate(&aview1(&file.samples[i])).unwrap();
                for out in &file.outputs {
                    let expected = out.values[i];
                    let err = (ev.outputs[&out.name] - expected).abs();
                    assert!(
                        err <= 1e-6 * expected.abs().max(1.),
                        "{name}/{}: {} vs {expected}",
                        out.name,
                        ev.outputs[&out.name]
                    );
                }
            }
        }
    }

    #[test]
    fn test_packaged_deck_gradients_match_central_differences() {
        let deck = EngineDeck::packaged("n3").unwrap();
        let point = array![15000., 0.55, 0.8];
        let ev = deck.evaluate(&point).unwrap();
        let steps = [1., 1e-5, 1e-5];
        for k in 0..3 {
            let mut p = point.clone();
            let mut m = point.clone();
            p[k] += steps[k];
            m[k] -= steps[k];
            let evp = deck.evaluate(&p).unwrap();
            let evm = deck.evaluate(&m).unwrap();
            for out in deck.output_names() {
                let fdiff = (evp.outputs[out] - evm.outputs[out]) / (2. * steps[k]);
                let analytic = ev.jacobian[out][k];
                let rel = (analytic - fdiff).abs() / fdiff.abs().max(1e-9);
                assert!(
                    rel < 1e-4,
                    "{out}, dim {k}: analytic {analytic}, fdiff {fdiff}"
                );
            }
        }
    }

    #[test]
    fn test_hybrid_deck_exposes_electric_load() {
        let deck = EngineDeck::packaged("n3_hybrid").unwrap();
        assert_eq!(deck.output_names(), ["thrust", "fuel_flow", "electric_load"]);
        let ev = deck.evaluate(&array![20000., 0.5, 0.75]).unwrap();
        assert!(ev.outputs["electric_load"] > 0.);
        assert_eq!(ev.jacobian["electric_load"].len(), 3);
    }
}
