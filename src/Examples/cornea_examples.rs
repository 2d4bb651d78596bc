use crate::Utils::logger::save_outcome;
use crate::Utils::plots::save_plots;
use crate::Utils::profiling::StageTimer;
use crate::Utils::sys_info::log_system_info;
use crate::numerical::BVP_FD::FD_Newton::{FdConfig, FiniteDifferenceSolver};
use crate::numerical::Comparison_api::{ComparisonConfig, ComparisonOutcome, run_comparison};
use crate::numerical::Cornea_problem::CorneaProblem;
use crate::numerical::ShootingBVP::Shooting_simple::{ShootingConfig, ShootingMethodSolver};
use crate::numerical::Solver_api::Profile;
use crate::numerical::solver_errors::CorneaResult;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tabled::{builder::Builder, settings::Style};

/// Runs the comparison, then writes csv/json reports into `out_dir` and plots into `out_dir/plots`.
pub fn run_and_report(
    config: &ComparisonConfig,
    out_dir: &Path,
) -> CorneaResult<ComparisonOutcome> {
    let system = log_system_info();
    let mut timer = StageTimer::new();
    timer.tic("solvers + analysis");
    let outcome = run_comparison(config)?;
    timer.tic("reports");
    save_outcome(config, &outcome, &system, out_dir)?;
    timer.tic("plots");
    match &outcome.report {
        Ok(report) => {
            if let Err(e) = save_plots(report, &out_dir.join("plots")) {
                warn!("plots were not produced: {}", e);
            }
        }
        Err(e) => warn!("no report to plot: {}", e),
    }
    timer.tac();
    info!("\n{}", timer.table());
    Ok(outcome)
}

pub fn cornea_examples(example: usize) -> CorneaResult<()> {
    match example {
        0 => {
            // all four methods with default tunables, solvers on the rayon pool
            let config = ComparisonConfig {
                parallel: true,
                ..ComparisonConfig::default()
            };
            let outcome = run_and_report(&config, Path::new("."))?;
            info!(
                "{} methods succeeded, {} failed, total {:.3} s",
                outcome.results.len(),
                outcome.failures.len(),
                outcome.total_time
            );
        }
        1 => {
            // the same run described by a task document
            let document = r#"
                model
                a: 7.8
                b: 0.5
                x_min: 0.0
                x_max: 1.0
                shooting
                step_size: 1e-3
                root_finder: secant
                finite_difference
                n_nodes: 401
                jacobian: numerical
                pinn
                hidden: 16, 16
                epochs: 2000
                run
                methods: MOL, Shooting, FiniteDiff, PINN
                parallel: false
            "#;
            let config = ComparisonConfig::from_document(document)?;
            run_and_report(&config, Path::new("."))?;
        }
        2 => {
            // shooting solution used as the initial guess of Newton-Raphson
            let problem = Arc::new(CorneaProblem::from_raw(7.8, 0.5, 0.0, 1.0)?);
            let mut shooting =
                ShootingMethodSolver::new(problem.clone(), ShootingConfig::default())?;
            let shot = shooting.shoot()?;
            let profile = Profile::new(
                shot.x_mesh.iter().copied().collect(),
                shot.y.row(0).iter().copied().collect(),
            )?;
            let fd = FiniteDifferenceSolver::new(problem, FdConfig::default())?;
            let flat = fd.newton()?;
            let chained = fd.solve_from(fd.resample(&profile)?)?;
            info!(
                "Newton iterations: {} from the flat guess, {} from the shooting profile",
                flat.iterations, chained.iterations
            );
        }
        3 => {
            // apex height against the linearized closed form for growing a
            let mut builder = Builder::default();
            builder.push_record(["a", "h(0) finite differences", "h(0) linearized", "difference"]);
            for a in [1.0, 2.0, 4.0, 7.8, 12.0] {
                let problem = Arc::new(CorneaProblem::from_raw(a, 0.5, 0.0, 1.0)?);
                let fd = FiniteDifferenceSolver::new(problem.clone(), FdConfig::default())?;
                let solution = fd.newton()?;
                let apex = solution.h[0];
                let linear = problem.linearized_apex_height();
                builder.push_record([
                    a.to_string(),
                    format!("{:.6}", apex),
                    format!("{:.6}", linear),
                    format!("{:.2e}", apex - linear),
                ]);
            }
            let mut table = builder.build();
            table.with(Style::modern_rounded());
            info!("\n{}", table);
        }
        _ => {
            warn!(
                "no example {}; available: 0 (default comparison), 1 (task document), 2 (chained guess), 3 (sweep in a)",
                example
            );
        }
    }
    Ok(())
}
