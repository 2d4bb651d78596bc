#[cfg(test)]
mod tests {
    use crate::numerical::Cornea_problem::CorneaProblem;
    use crate::numerical::PINN::PINN_solver::{Adam, PinnConfig, PinnSolver};
    use crate::numerical::Solver_api::{BvpSolver, Diagnostics, Method, SoftFlag, TrainingStatus};
    use crate::numerical::solver_errors::CorneaError;
    use simplelog::*;
    use std::sync::Arc;

    fn init_logger() {
        let _ = SimpleLogger::init(LevelFilter::Info, Config::default());
    }

    fn problem() -> Arc<CorneaProblem> {
        Arc::new(CorneaProblem::from_raw(7.8, 0.5, 0.0, 1.0).unwrap())
    }

    fn small_config() -> PinnConfig {
        PinnConfig {
            hidden_layers: vec![6, 6],
            n_collocation: 12,
            epochs: 200,
            log_every: 0,
            ..PinnConfig::default()
        }
    }

    #[test]
    fn loss_gradient_matches_finite_differences() {
        let mut solver = PinnSolver::new(problem(), small_config()).unwrap();
        let (loss, grad) = solver.loss_and_gradient();
        assert!((loss - solver.loss()).abs() <= 1e-12 * loss.max(1.0));

        let p0 = solver.network().parameters();
        let eps = 1e-6;
        for k in 0..p0.len() {
            let mut p = p0.clone();
            p[k] = p0[k] + eps;
            solver.set_parameters(&p).unwrap();
            let plus = solver.loss();
            p[k] = p0[k] - eps;
            solver.set_parameters(&p).unwrap();
            let minus = solver.loss();
            let fd = (plus - minus) / (2.0 * eps);
            assert!(
                (grad[k] - fd).abs() <= 1e-5 * grad[k].abs().max(1.0),
                "parameter {}: {} vs {}",
                k,
                grad[k],
                fd
            );
        }
    }

    #[test]
    fn training_decreases_the_loss() {
        init_logger();
        let mut solver = PinnSolver::new(problem(), small_config()).unwrap();
        let initial = solver.loss();
        let report = solver.train().unwrap();
        assert_eq!(report.status, TrainingStatus::EpochLimit);
        assert_eq!(report.epochs, 200);
        assert_eq!(report.loss_history.len(), 200);
        assert_eq!(report.loss_history[0], initial);
        assert!(report.best_loss < initial);
        // best parameters are restored
        assert!((solver.loss() - report.best_loss).abs() <= 1e-12 * report.best_loss.max(1.0));
    }

    #[test]
    fn same_seed_same_run() {
        let config = PinnConfig {
            epochs: 20,
            ..small_config()
        };
        let mut first = PinnSolver::new(problem(), config.clone()).unwrap();
        let mut second = PinnSolver::new(problem(), config.clone()).unwrap();
        assert_eq!(first.network(), second.network());
        let r1 = first.train().unwrap();
        let r2 = second.train().unwrap();
        assert_eq!(r1.loss_history, r2.loss_history);
        let other_seed = PinnSolver::new(
            problem(),
            PinnConfig {
                seed: 43,
                ..config
            },
        )
        .unwrap();
        assert_ne!(other_seed.network().parameters(), first.network().parameters());
    }

    #[test]
    fn stalled_training_raises_soft_flag() {
        init_logger();
        let config = PinnConfig {
            patience: 1,
            min_delta: 0.99,
            ..small_config()
        };
        let mut solver = PinnSolver::new(problem(), config).unwrap();
        let out = solver.solve().unwrap();
        match out.diagnostics {
            Diagnostics::Pinn { epochs, status, .. } => {
                assert_eq!(status, TrainingStatus::Stalled);
                assert_eq!(epochs, 2);
            }
            other => panic!("unexpected diagnostics {:?}", other),
        }
        assert!(matches!(
            out.flags.as_slice(),
            [SoftFlag::TrainingDivergence { epochs: 2, .. }]
        ));
        // the profile is still produced
        assert_eq!(out.profile.len(), 201);
    }

    #[test]
    fn time_budget_and_threshold_stop_training() {
        let config = PinnConfig {
            max_training_time: Some(0.0),
            ..small_config()
        };
        let mut solver = PinnSolver::new(problem(), config).unwrap();
        let report = solver.train().unwrap();
        assert_eq!(report.status, TrainingStatus::TimeLimit);
        assert_eq!(report.epochs, 1);
        assert!(report.soft_flag().is_none());

        let config = PinnConfig {
            loss_threshold: 1e12,
            ..small_config()
        };
        let mut solver = PinnSolver::new(problem(), config).unwrap();
        let report = solver.train().unwrap();
        assert_eq!(report.status, TrainingStatus::Converged);
        assert_eq!(report.epochs, 1);
    }

    #[test]
    fn solve_predicts_on_output_grid() {
        init_logger();
        let mut solver = PinnSolver::new(problem(), small_config()).unwrap();
        assert_eq!(solver.method(), Method::PINN);
        let out = solver.solve().unwrap();
        assert_eq!(out.profile.len(), 201);
        assert_eq!(out.profile.x_min(), 0.0);
        assert_eq!(out.profile.x_max(), 1.0);
        assert_eq!(solver.predict(&[0.0, 0.5]).len(), 2);
        assert!(solver.training_report().is_some());
        assert_eq!(solver.collocation_points().len(), 12);
        assert!(solver.collocation_points().iter().all(|x| *x > 0.0 && *x < 1.0));
    }

    #[test]
    fn invalid_architecture_is_rejected() {
        let config = PinnConfig {
            hidden_layers: vec![],
            ..PinnConfig::default()
        };
        assert!(matches!(
            PinnSolver::new(problem(), config),
            Err(CorneaError::InvalidParameters(_))
        ));
    }

    #[test]
    fn adam_moves_against_the_gradient() {
        let mut adam = Adam::new(2, 0.1);
        let mut p = vec![1.0, -1.0];
        adam.step(&mut p, &[2.0, -0.5]);
        // first bias-corrected step has magnitude lr
        assert!((p[0] - 0.9).abs() < 1e-6);
        assert!((p[1] + 0.9).abs() < 1e-6);
    }
}
