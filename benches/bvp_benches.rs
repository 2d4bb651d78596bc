use RustedCornea::numerical::BVP_FD::FD_Newton::{FdConfig, FiniteDifferenceSolver};
use RustedCornea::numerical::BVP_MOL::MOL_solver::{MethodOfLinesSolver, MolConfig};
use RustedCornea::numerical::Cornea_problem::CorneaProblem;
use RustedCornea::numerical::PINN::PINN_solver::{PinnConfig, PinnSolver};
use RustedCornea::numerical::ShootingBVP::Shooting_simple::{ShootingConfig, ShootingMethodSolver};
use RustedCornea::numerical::Solver_api::JacobianKind;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

fn problem() -> Arc<CorneaProblem> {
    Arc::new(CorneaProblem::from_raw(7.8, 0.5, 0.0, 1.0).unwrap())
}

fn bench_mol(c: &mut Criterion) {
    let solver = MethodOfLinesSolver::new(
        problem(),
        MolConfig {
            n_nodes: 401,
            ..MolConfig::default()
        },
    )
    .unwrap();
    c.bench_function("MOL 401 nodes", |b| b.iter(|| black_box(solver.relax().unwrap())));
}

fn bench_shooting(c: &mut Criterion) {
    let problem = problem();
    c.bench_function("shooting RK4 h=1e-3", |b| {
        b.iter(|| {
            let mut solver =
                ShootingMethodSolver::new(problem.clone(), ShootingConfig::default()).unwrap();
            black_box(solver.shoot().unwrap())
        })
    });
}

fn bench_fd(c: &mut Criterion) {
    let mut group = c.benchmark_group("FD Newton 201 nodes");
    for jacobian in [JacobianKind::Analytic, JacobianKind::Numerical] {
        let solver = FiniteDifferenceSolver::new(
            problem(),
            FdConfig {
                jacobian,
                ..FdConfig::default()
            },
        )
        .unwrap();
        group.bench_function(jacobian.to_string(), |b| {
            b.iter(|| black_box(solver.newton().unwrap()))
        });
    }
    group.finish();
}

fn bench_pinn_gradient(c: &mut Criterion) {
    let solver = PinnSolver::new(problem(), PinnConfig::default()).unwrap();
    c.bench_function("PINN loss and gradient", |b| {
        b.iter(|| black_box(solver.loss_and_gradient()))
    });
}

criterion_group!(benches, bench_mol, bench_shooting, bench_fd, bench_pinn_gradient);
criterion_main!(benches);
