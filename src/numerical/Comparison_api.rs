//! # Running the comparison
//!
//! [`ComparisonConfig`] gathers the model, the tunables of every solver and of the analysis. It can be
//! built in code (every field has a default) or read from a sectioned text document:
//! ```text
//! model
//! a: 7.8
//! b: 0.5
//! x_min: 0.0
//! x_max: 1.0
//! shooting
//! step_size: 1e-3
//! root_finder: secant
//! pinn
//! hidden: 20, 20
//! epochs: 3000
//! run
//! methods: MOL, Shooting, FiniteDiff, PINN
//! parallel: true
//! ```
//! [`run_comparison`] validates everything before the first solver starts, runs the selected solvers
//! (one after another, or on the rayon pool) and hands the collected results to the analyzer.
//! A solver that fails ends up in the failures map with its wall time; the others are unaffected.
use crate::Utils::profiling::format_elapsed;
use crate::Utils::task_parser::{SectionReader, parse_document};
use crate::numerical::Analysis::analyzer::{AnalysisConfig, ComparisonReport, PerformanceAnalyzer};
use crate::numerical::BVP_FD::FD_Newton::{FdConfig, FiniteDifferenceSolver};
use crate::numerical::BVP_MOL::MOL_solver::{MethodOfLinesSolver, MolConfig};
use crate::numerical::Cornea_problem::CorneaProblem;
use crate::numerical::PINN::PINN_solver::{PinnConfig, PinnSolver};
use crate::numerical::ShootingBVP::Shooting_simple::{ShootingConfig, ShootingMethodSolver};
use crate::numerical::Solver_api::{BvpSolver, Method, SolverFailure, SolverResult, timed_solve};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use log::{error, info};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonConfig {
    pub a: f64,
    pub b: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub mol: MolConfig,
    pub shooting: ShootingConfig,
    pub finite_difference: FdConfig,
    pub pinn: PinnConfig,
    pub analysis: AnalysisConfig,
    /// solvers to run, the reference has to be among them
    pub methods: Vec<Method>,
    pub parallel: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            a: 7.8,
            b: 0.5,
            x_min: 0.0,
            x_max: 1.0,
            mol: MolConfig::default(),
            shooting: ShootingConfig::default(),
            finite_difference: FdConfig::default(),
            pinn: PinnConfig::default(),
            analysis: AnalysisConfig::default(),
            methods: Method::iter().collect(),
            parallel: false,
        }
    }
}

const MODEL_KEYS: &[&str] = &["a", "b", "x_min", "x_max"];
const MOL_KEYS: &[&str] = &[
    "n_nodes",
    "tolerance",
    "max_steps",
    "dt0",
    "dt_growth",
    "dt_max",
    "reject_factor",
];
const SHOOTING_KEYS: &[&str] = &[
    "initial_guess",
    "tolerance",
    "max_iterations",
    "step_size",
    "root_finder",
    "max_rk4_steps",
];
const FD_KEYS: &[&str] = &["n_nodes", "tolerance", "max_iterations", "jacobian"];
const PINN_KEYS: &[&str] = &[
    "hidden",
    "seed",
    "n_collocation",
    "w_res",
    "w_bc",
    "learning_rate",
    "epochs",
    "loss_threshold",
    "patience",
    "min_delta",
    "max_training_time",
    "n_output",
    "log_every",
];
const ANALYSIS_KEYS: &[&str] = &[
    "reference",
    "min_coverage",
    "resolution",
    "large_error_threshold",
];
const RUN_KEYS: &[&str] = &["methods", "parallel"];

/// overwrite `target` only when the key is present
fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl ComparisonConfig {
    /// Defaults overridden by the sections present in `text`.
    pub fn from_document(text: &str) -> CorneaResult<Self> {
        let document = parse_document(text)?;
        let mut config = ComparisonConfig::default();
        for (title, section) in &document {
            match title.as_str() {
                "model" => {
                    let r = SectionReader::new(title, section, MODEL_KEYS)?;
                    set(&mut config.a, r.f64("a")?);
                    set(&mut config.b, r.f64("b")?);
                    set(&mut config.x_min, r.f64("x_min")?);
                    set(&mut config.x_max, r.f64("x_max")?);
                }
                "mol" => {
                    let r = SectionReader::new(title, section, MOL_KEYS)?;
                    let mol = &mut config.mol;
                    set(&mut mol.n_nodes, r.usize("n_nodes")?);
                    set(&mut mol.tolerance, r.f64("tolerance")?);
                    set(&mut mol.max_steps, r.usize("max_steps")?);
                    set(&mut mol.dt0, r.f64("dt0")?);
                    set(&mut mol.dt_growth, r.f64("dt_growth")?);
                    set(&mut mol.dt_max, r.f64("dt_max")?);
                    set(&mut mol.reject_factor, r.f64("reject_factor")?);
                }
                "shooting" => {
                    let r = SectionReader::new(title, section, SHOOTING_KEYS)?;
                    let shooting = &mut config.shooting;
                    if let Some(guess) = r.f64("initial_guess")? {
                        shooting.initial_guess = Some(guess);
                    }
                    set(&mut shooting.tolerance, r.f64("tolerance")?);
                    set(&mut shooting.max_iterations, r.usize("max_iterations")?);
                    set(&mut shooting.step_size, r.f64("step_size")?);
                    set(&mut shooting.root_finder, r.parse("root_finder")?);
                    set(&mut shooting.max_rk4_steps, r.usize("max_rk4_steps")?);
                }
                "finite_difference" => {
                    let r = SectionReader::new(title, section, FD_KEYS)?;
                    let fd = &mut config.finite_difference;
                    set(&mut fd.n_nodes, r.usize("n_nodes")?);
                    set(&mut fd.tolerance, r.f64("tolerance")?);
                    set(&mut fd.max_iterations, r.usize("max_iterations")?);
                    set(&mut fd.jacobian, r.parse("jacobian")?);
                }
                "pinn" => {
                    let r = SectionReader::new(title, section, PINN_KEYS)?;
                    let pinn = &mut config.pinn;
                    set(&mut pinn.hidden_layers, r.usize_list("hidden")?);
                    set(&mut pinn.seed, r.usize("seed")?.map(|s| s as u64));
                    set(&mut pinn.n_collocation, r.usize("n_collocation")?);
                    set(&mut pinn.w_res, r.f64("w_res")?);
                    set(&mut pinn.w_bc, r.f64("w_bc")?);
                    set(&mut pinn.learning_rate, r.f64("learning_rate")?);
                    set(&mut pinn.epochs, r.usize("epochs")?);
                    set(&mut pinn.loss_threshold, r.f64("loss_threshold")?);
                    set(&mut pinn.patience, r.usize("patience")?);
                    set(&mut pinn.min_delta, r.f64("min_delta")?);
                    if let Some(t) = r.f64("max_training_time")? {
                        pinn.max_training_time = Some(t);
                    }
                    set(&mut pinn.n_output, r.usize("n_output")?);
                    set(&mut pinn.log_every, r.usize("log_every")?);
                }
                "analysis" => {
                    let r = SectionReader::new(title, section, ANALYSIS_KEYS)?;
                    let analysis = &mut config.analysis;
                    set(&mut analysis.reference, r.parse("reference")?);
                    set(&mut analysis.min_coverage, r.f64("min_coverage")?);
                    set(&mut analysis.resolution, r.usize("resolution")?);
                    set(
                        &mut analysis.large_error_threshold,
                        r.f64("large_error_threshold")?,
                    );
                }
                "run" => {
                    let r = SectionReader::new(title, section, RUN_KEYS)?;
                    set(&mut config.methods, r.parse_list("methods")?);
                    set(&mut config.parallel, r.bool("parallel")?);
                }
                other => {
                    return Err(CorneaError::Config(format!(
                        "unknown section '{}', expected one of model, mol, shooting, finite_difference, pinn, analysis, run",
                        other
                    )));
                }
            }
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CorneaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_document(&text)
    }

    /// Checks every tunable and builds the shared problem.
    pub fn validate(&self) -> CorneaResult<Arc<CorneaProblem>> {
        let problem = CorneaProblem::from_raw(self.a, self.b, self.x_min, self.x_max)?;
        self.mol.validate()?;
        self.shooting.validate()?;
        self.finite_difference.validate()?;
        self.pinn.validate()?;
        self.analysis.validate()?;
        if !self.methods.contains(&self.analysis.reference) {
            return Err(CorneaError::InvalidParameters(format!(
                "reference method {} is not among the methods to run {:?}",
                self.analysis.reference, self.methods
            )));
        }
        Ok(Arc::new(problem))
    }
}

/// everything one comparison run produces
#[derive(Debug)]
pub struct ComparisonOutcome {
    pub results: BTreeMap<Method, SolverResult>,
    pub failures: BTreeMap<Method, SolverFailure>,
    /// fails only when the reference has no result
    pub report: CorneaResult<ComparisonReport>,
    /// seconds, all solvers and the analysis
    pub total_time: f64,
}

type BoxedSolver = Box<dyn BvpSolver + Send>;

fn build_solvers(
    config: &ComparisonConfig,
    problem: &Arc<CorneaProblem>,
) -> CorneaResult<Vec<BoxedSolver>> {
    let mut methods = config.methods.clone();
    methods.sort();
    methods.dedup();
    methods
        .into_iter()
        .map(|method| -> CorneaResult<BoxedSolver> {
            let solver: BoxedSolver = match method {
                Method::MOL => Box::new(MethodOfLinesSolver::new(
                    problem.clone(),
                    config.mol.clone(),
                )?),
                Method::Shooting => Box::new(ShootingMethodSolver::new(
                    problem.clone(),
                    config.shooting.clone(),
                )?),
                Method::FiniteDiff => Box::new(FiniteDifferenceSolver::new(
                    problem.clone(),
                    config.finite_difference.clone(),
                )?),
                Method::PINN => Box::new(PinnSolver::new(problem.clone(), config.pinn.clone())?),
            };
            Ok(solver)
        })
        .collect()
}

/// Validates the configuration, runs the selected solvers and analyzes their results.
/// Invalid parameters are returned as an error before any solver runs.
pub fn run_comparison(config: &ComparisonConfig) -> CorneaResult<ComparisonOutcome> {
    let problem = config.validate().map_err(|e| {
        error!("invalid configuration: {}", e);
        e
    })?;
    let analyzer = PerformanceAnalyzer::new(config.analysis.clone())?;
    let mut solvers = build_solvers(config, &problem)?;
    info!(
        "comparing {} methods for a = {}, b = {} on [{}, {}] ({})",
        solvers.len(),
        config.a,
        config.b,
        config.x_min,
        config.x_max,
        if config.parallel { "parallel" } else { "sequential" }
    );
    let begin = Instant::now();
    let outcomes: Vec<Result<SolverResult, SolverFailure>> = if config.parallel {
        solvers
            .par_iter_mut()
            .map(|solver| timed_solve(solver.as_mut()))
            .collect()
    } else {
        solvers
            .iter_mut()
            .map(|solver| timed_solve(solver.as_mut()))
            .collect()
    };

    let mut results = BTreeMap::new();
    let mut failures = BTreeMap::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => {
                results.insert(result.method, result);
            }
            Err(failure) => {
                failures.insert(failure.method, failure);
            }
        }
    }
    let report = analyzer.analyze(&results, &failures);
    if let Err(e) = &report {
        error!("analysis failed: {}", e);
    }
    let elapsed = begin.elapsed();
    info!("comparison finished in {}", format_elapsed(elapsed));
    let total_time = elapsed.as_secs_f64();
    Ok(ComparisonOutcome {
        results,
        failures,
        report,
        total_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Solver_api::{JacobianKind, SoftFlag};
    use crate::numerical::ShootingBVP::Shooting_simple::RootFinder;
    use simplelog::*;

    fn init_logger() {
        let _ = SimpleLogger::init(LevelFilter::Info, Config::default());
    }

    fn fast_config() -> ComparisonConfig {
        ComparisonConfig {
            pinn: PinnConfig {
                hidden_layers: vec![8, 8],
                epochs: 50,
                n_collocation: 16,
                log_every: 0,
                ..PinnConfig::default()
            },
            ..ComparisonConfig::default()
        }
    }

    #[test]
    fn negative_a_is_rejected_before_solving() {
        let config = ComparisonConfig {
            a: -1.0,
            ..fast_config()
        };
        assert!(matches!(
            run_comparison(&config),
            Err(CorneaError::InvalidParameters(_))
        ));
        let config = ComparisonConfig {
            methods: vec![Method::Shooting, Method::FiniteDiff],
            ..fast_config()
        };
        assert!(matches!(
            run_comparison(&config),
            Err(CorneaError::InvalidParameters(_))
        ));
    }

    #[test]
    fn classical_methods_agree() {
        init_logger();
        let config = ComparisonConfig {
            methods: vec![Method::MOL, Method::Shooting, Method::FiniteDiff],
            ..fast_config()
        };
        let outcome = run_comparison(&config).unwrap();
        assert!(outcome.failures.is_empty());
        let report = outcome.report.unwrap();
        for (first, second) in [
            (Method::MOL, Method::Shooting),
            (Method::MOL, Method::FiniteDiff),
            (Method::Shooting, Method::FiniteDiff),
        ] {
            let stats = report.pairwise(first, second).unwrap();
            assert!(stats.max_abs < 1e-3, "{} vs {}: {}", first, second, stats.max_abs);
        }
        let problem = config.validate().unwrap();
        for result in outcome.results.values() {
            let (apex_slope, far_value) =
                problem.boundary_mismatch(result.profile.x(), result.profile.h());
            assert!(apex_slope < 1e-3, "{}: apex slope {}", result.method, apex_slope);
            assert!(far_value < 1e-6, "{}: far value {}", result.method, far_value);
        }
        assert_eq!(report.accuracy_ranking[0], (Method::MOL, 0.0));
        assert_eq!(report.accuracy_ranking.len(), 3);
    }

    #[test]
    fn default_run_ranks_all_four_methods() {
        init_logger();
        let config = ComparisonConfig::default();
        let outcome = run_comparison(&config).unwrap();
        assert!(outcome.failures.is_empty());
        assert!(outcome.results[&Method::PINN].flags.is_empty());
        let report = outcome.report.unwrap();
        for method in Method::iter() {
            assert!(!report.is_flagged(method), "{} is flagged", method);
        }
        let ranked: Vec<Method> = report.accuracy_ranking.iter().map(|(m, _)| *m).collect();
        assert_eq!(ranked, vec![Method::MOL, Method::Shooting, Method::FiniteDiff, Method::PINN]);
        assert_eq!(report.accuracy_ranking[0].1, 0.0);
        assert!(
            report
                .accuracy_ranking
                .windows(2)
                .all(|pair| pair[0].1 <= pair[1].1)
        );
        for (method, rmse) in &report.accuracy_ranking {
            assert_eq!(report.stats(*method).unwrap().rmse, *rmse);
        }
        // the trained network honours both boundary conditions
        let problem = config.validate().unwrap();
        let pinn = &outcome.results[&Method::PINN];
        let (apex_slope, far_value) = problem.boundary_mismatch(pinn.profile.x(), pinn.profile.h());
        assert!(apex_slope < 1e-3, "PINN apex slope {}", apex_slope);
        assert!(far_value < 1e-3, "PINN far value {}", far_value);
    }

    #[test]
    fn parallel_run_isolates_failures() {
        init_logger();
        let config = ComparisonConfig {
            finite_difference: FdConfig {
                max_iterations: 1,
                ..FdConfig::default()
            },
            parallel: true,
            ..fast_config()
        };
        let outcome = run_comparison(&config).unwrap();
        assert!(matches!(
            outcome.failures[&Method::FiniteDiff].error,
            CorneaError::NewtonDivergence { iterations: 1, .. }
        ));
        assert_eq!(outcome.results.len(), 3);
        let report = outcome.report.unwrap();
        assert_eq!(report.speed_ranking.len(), 4);
        assert!(report.stats(Method::FiniteDiff).is_none());
        assert!(
            report
                .accuracy_ranking
                .iter()
                .all(|(m, _)| *m != Method::FiniteDiff)
        );
        // the PINN trained for 50 epochs only: far from the reference, so it is flagged
        assert!(
            report.flags[&Method::PINN]
                .iter()
                .any(|f| matches!(f, SoftFlag::LargeError { .. }))
        );
    }

    #[test]
    fn config_document_overrides_defaults() {
        let doc = "
        model
        a: 3
        b: -0.4
        shooting
        step_size: 5e-4
        root_finder: bisection
        finite_difference
        jacobian: numerical
        n_nodes: 101
        pinn
        hidden: 16, 16, 8
        epochs: 3000
        max_training_time: 2.5
        analysis
        reference: MOL
        resolution: 401
        run
        methods: MOL, FiniteDiff
        parallel: true
        ";
        let config = ComparisonConfig::from_document(doc).unwrap();
        assert_eq!(config.a, 3.0);
        assert_eq!(config.b, -0.4);
        assert_eq!(config.x_max, 1.0);
        assert_eq!(config.shooting.step_size, 5e-4);
        assert_eq!(config.shooting.root_finder, RootFinder::Bisection);
        assert_eq!(config.finite_difference.jacobian, JacobianKind::Numerical);
        assert_eq!(config.finite_difference.n_nodes, 101);
        assert_eq!(config.pinn.hidden_layers, vec![16, 16, 8]);
        assert_eq!(config.pinn.epochs, 3000);
        assert_eq!(config.pinn.max_training_time, Some(2.5));
        assert_eq!(config.pinn.seed, 42);
        assert_eq!(config.analysis.resolution, 401);
        assert_eq!(config.methods, vec![Method::MOL, Method::FiniteDiff]);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_document_errors() {
        for doc in [
            "viscosity\n mu: 1",
            "model\n c: 1",
            "model\n a: soft",
            "shooting\n root_finder: newton",
            "run\n methods: MOL, Euler",
            "pinn\n hidden: 20, -3",
        ] {
            assert!(
                matches!(ComparisonConfig::from_document(doc), Err(CorneaError::Config(_))),
                "{}",
                doc
            );
        }
    }
}
