//! # Physics-informed neural network
//!
//! `h_θ(x)` is a tanh MLP fed with `ξ = 2 (x - x_min) / L - 1 ∈ [-1, 1]`. The loss combines the
//! ODE residual on uniform interior collocation points with a penalty on both boundary conditions:
//! ```text
//! loss = w_res * mean_i R(x_i, h, h', h'')^2 + w_bc * [(h'(x_min) - α)^2 + (h(x_max) - β)^2]
//! ```
//! `h'`, `h''` come from the jets of the network, the loss gradient from reverse accumulation
//! through them (no finite differences anywhere). Parameters are updated with Adam.
//! The best parameters seen during training are restored at the end.
use crate::numerical::Cornea_problem::CorneaProblem;
use crate::numerical::PINN::jet::Jet;
use crate::numerical::PINN::mlp::Mlp;
use crate::numerical::Solver_api::{
    BvpSolver, Diagnostics, Method, Profile, SoftFlag, SolverOutput, TrainingStatus,
};
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, PartialEq)]
pub struct PinnConfig {
    pub hidden_layers: Vec<usize>,
    pub seed: u64,
    pub n_collocation: usize,
    pub w_res: f64,
    pub w_bc: f64,
    pub learning_rate: f64,
    pub epochs: usize,
    pub loss_threshold: f64,
    /// epochs without relative improvement of `min_delta` before training is declared stalled
    pub patience: usize,
    pub min_delta: f64,
    /// wall-clock budget in seconds
    pub max_training_time: Option<f64>,
    /// nodes of the grid `solve()` predicts on
    pub n_output: usize,
    pub log_every: usize,
}

impl Default for PinnConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![20, 20],
            seed: 42,
            n_collocation: 64,
            w_res: 1.0,
            w_bc: 10.0,
            learning_rate: 1e-3,
            epochs: 5000,
            loss_threshold: 1e-9,
            patience: 1000,
            min_delta: 1e-4,
            max_training_time: None,
            n_output: 201,
            log_every: 500,
        }
    }
}

impl PinnConfig {
    pub fn validate(&self) -> CorneaResult<()> {
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(CorneaError::InvalidParameters(format!(
                "hidden layers must be non-empty and positive, got {:?}",
                self.hidden_layers
            )));
        }
        if self.n_collocation == 0 || self.epochs == 0 || self.n_output < 2 {
            return Err(CorneaError::InvalidParameters(
                "collocation points, epochs and output nodes must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || !(self.w_res > 0.0) || !(self.w_bc > 0.0) {
            return Err(CorneaError::InvalidParameters(
                "learning rate and loss weights must be positive".to_string(),
            ));
        }
        if let Some(t) = self.max_training_time {
            if !(t >= 0.0) {
                return Err(CorneaError::InvalidParameters(format!(
                    "training time budget must be non-negative, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}

/// Adam with bias correction
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: i32,
}

impl Adam {
    pub fn new(n_parameters: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; n_parameters],
            v: vec![0.0; n_parameters],
            t: 0,
        }
    }

    pub fn step(&mut self, params: &mut [f64], grad: &[f64]) {
        self.t += 1;
        let c1 = 1.0 - self.beta1.powi(self.t);
        let c2 = 1.0 - self.beta2.powi(self.t);
        for (((p, g), m), v) in params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / c1;
            let v_hat = *v / c2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs: usize,
    /// loss of the last evaluated epoch
    pub final_loss: f64,
    /// loss of the restored parameters
    pub best_loss: f64,
    pub status: TrainingStatus,
    pub loss_history: Vec<f64>,
    pub elapsed: f64,
}

impl TrainingReport {
    pub fn soft_flag(&self) -> Option<SoftFlag> {
        match self.status {
            TrainingStatus::Stalled | TrainingStatus::NonFinite => {
                Some(SoftFlag::TrainingDivergence {
                    epochs: self.epochs,
                    final_loss: self.final_loss,
                    best_loss: self.best_loss,
                })
            }
            _ => None,
        }
    }
}

pub struct PinnSolver {
    problem: Arc<CorneaProblem>,
    pub config: PinnConfig,
    net: Mlp,
    collocation: Vec<f64>,
    report: Option<TrainingReport>,
}

impl PinnSolver {
    pub fn new(problem: Arc<CorneaProblem>, config: PinnConfig) -> CorneaResult<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let net = Mlp::new(&config.hidden_layers, &mut rng);
        let domain = problem.domain();
        let n = config.n_collocation;
        let collocation = (1..=n)
            .map(|i| domain.x_min() + domain.length() * i as f64 / (n + 1) as f64)
            .collect();
        Ok(Self {
            problem,
            config,
            net,
            collocation,
            report: None,
        })
    }

    pub fn network(&self) -> &Mlp {
        &self.net
    }
    pub fn set_parameters(&mut self, params: &[f64]) -> CorneaResult<()> {
        self.net.set_parameters(params)
    }
    pub fn collocation_points(&self) -> &[f64] {
        &self.collocation
    }
    pub fn training_report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    /// input jet of `x`: the normalization is affine, so d(xi)/dx = 2/L and the second derivative vanishes
    fn input_jet(&self, x: f64) -> Jet {
        let domain = self.problem.domain();
        let scale = 2.0 / domain.length();
        Jet::new(scale * (x - domain.x_min()) - 1.0, scale, 0.0)
    }

    /// `(h, h', h'')` of the network at `x`
    pub fn eval(&self, x: f64) -> Jet {
        self.net.forward(self.input_jet(x))
    }

    pub fn loss(&self) -> f64 {
        let n = self.collocation.len() as f64;
        let residual: f64 = self
            .collocation
            .iter()
            .map(|&x| {
                let h = self.eval(x);
                self.problem.residual(x, h.v, h.d1, h.d2).powi(2)
            })
            .sum::<f64>()
            / n;
        let domain = self.problem.domain();
        let apex = self.eval(domain.x_min());
        let far = self.eval(domain.x_max());
        let apex_err = apex.d1 - self.problem.left_bc().value;
        let far_err = far.v - self.problem.right_bc().value;
        self.config.w_res * residual + self.config.w_bc * (apex_err * apex_err + far_err * far_err)
    }

    /// loss and its gradient with respect to the flat parameter vector
    pub fn loss_and_gradient(&self) -> (f64, Vec<f64>) {
        let cfg = &self.config;
        let mut grad = vec![0.0; self.net.n_parameters()];
        let n = self.collocation.len() as f64;
        let mut residual_sum = 0.0;
        for &x in &self.collocation {
            let (h, tape) = self.net.forward_taped(self.input_jet(x));
            let r = self.problem.residual(x, h.v, h.d1, h.d2);
            residual_sum += r * r;
            // dR/dh'' = 1, dR/dh = -df/dh, dR/dh' = -df/dh'
            let g = 2.0 * cfg.w_res * r / n;
            let g_out = Jet::new(
                -g * self.problem.df_dh(x, h.v, h.d1),
                -g * self.problem.df_ddh(x, h.v, h.d1),
                g,
            );
            self.net.backward(&tape, g_out, &mut grad);
        }

        let domain = self.problem.domain();
        let (apex, tape) = self.net.forward_taped(self.input_jet(domain.x_min()));
        let apex_err = apex.d1 - self.problem.left_bc().value;
        self.net
            .backward(&tape, Jet::new(0.0, 2.0 * cfg.w_bc * apex_err, 0.0), &mut grad);
        let (far, tape) = self.net.forward_taped(self.input_jet(domain.x_max()));
        let far_err = far.v - self.problem.right_bc().value;
        self.net
            .backward(&tape, Jet::new(2.0 * cfg.w_bc * far_err, 0.0, 0.0), &mut grad);

        let loss = cfg.w_res * residual_sum / n
            + cfg.w_bc * (apex_err * apex_err + far_err * far_err);
        (loss, grad)
    }

    pub fn train(&mut self) -> CorneaResult<TrainingReport> {
        let cfg = self.config.clone();
        info!(
            "\n \n training PINN: layers {:?}, {} parameters, {} collocation points, {} epochs",
            cfg.hidden_layers,
            self.net.n_parameters(),
            cfg.n_collocation,
            cfg.epochs
        );
        let begin = Instant::now();
        let mut params = self.net.parameters();
        let mut adam = Adam::new(params.len(), cfg.learning_rate);
        let mut best_params = params.clone();
        let mut best_loss = f64::INFINITY;
        // loss level the patience counter is measured against
        let mut plateau_loss = f64::INFINITY;
        let mut since_improvement = 0;
        let mut loss_history = Vec::with_capacity(cfg.epochs);
        let mut status = TrainingStatus::EpochLimit;
        let mut final_loss = f64::NAN;
        let mut epochs = 0;

        for epoch in 0..cfg.epochs {
            let (loss, grad) = self.loss_and_gradient();
            epochs = epoch + 1;
            final_loss = loss;
            loss_history.push(loss);
            if !loss.is_finite() || grad.iter().any(|g| !g.is_finite()) {
                warn!("PINN loss became non-finite at epoch {}", epoch);
                status = TrainingStatus::NonFinite;
                break;
            }
            if loss < best_loss {
                best_loss = loss;
                best_params.copy_from_slice(&params);
            }
            if loss < plateau_loss * (1.0 - cfg.min_delta) {
                plateau_loss = loss;
                since_improvement = 0;
            } else {
                since_improvement += 1;
            }
            if cfg.log_every > 0 && epoch % cfg.log_every == 0 {
                info!("epoch {}: loss = {:e}", epoch, loss);
            }
            if loss < cfg.loss_threshold {
                status = TrainingStatus::Converged;
                break;
            }
            if since_improvement >= cfg.patience {
                warn!(
                    "PINN loss has not improved for {} epochs, best loss {:e}",
                    since_improvement, best_loss
                );
                status = TrainingStatus::Stalled;
                break;
            }
            if let Some(limit) = cfg.max_training_time {
                if begin.elapsed().as_secs_f64() >= limit {
                    info!("PINN training time budget of {} s exhausted", limit);
                    status = TrainingStatus::TimeLimit;
                    break;
                }
            }
            adam.step(&mut params, &grad);
            self.net.set_parameters(&params)?;
        }
        if best_loss.is_finite() {
            self.net.set_parameters(&best_params)?;
        }
        let report = TrainingReport {
            epochs,
            final_loss,
            best_loss,
            status,
            loss_history,
            elapsed: begin.elapsed().as_secs_f64(),
        };
        self.calc_statistics(&report);
        self.report = Some(report.clone());
        Ok(report)
    }

    /// network prediction of `h` on an arbitrary grid
    pub fn predict(&self, grid: &[f64]) -> Vec<f64> {
        grid.iter().map(|&x| self.eval(x).v).collect()
    }

    fn calc_statistics(&self, report: &TrainingReport) {
        let mut builder = Builder::default();
        let rows = [
            ("number of parameters", self.net.n_parameters().to_string()),
            ("epochs", report.epochs.to_string()),
            ("status", format!("{:?}", report.status)),
            ("final loss", format!("{:e}", report.final_loss)),
            ("best loss", format!("{:e}", report.best_loss)),
            ("time elapsed, s", format!("{:.3}", report.elapsed)),
        ];
        for (key, value) in rows {
            builder.push_record([key.to_string(), value]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        info!("\n \n PINN TRAINING STATISTICS \n \n {}", table);
    }
}

impl BvpSolver for PinnSolver {
    fn method(&self) -> Method {
        Method::PINN
    }
    fn solve(&mut self) -> CorneaResult<SolverOutput> {
        let report = self.train()?;
        let grid = self.problem.uniform_grid(self.config.n_output);
        let h = self.predict(&grid);
        let profile = Profile::new(grid, h)?;
        let flags: Vec<SoftFlag> = report.soft_flag().into_iter().collect();
        if !flags.is_empty() {
            warn!("PINN result is flagged: {:?}", report.status);
        }
        Ok(SolverOutput {
            profile,
            diagnostics: Diagnostics::Pinn {
                epochs: report.epochs,
                final_loss: report.final_loss,
                best_loss: report.best_loss,
                status: report.status,
                n_parameters: self.net.n_parameters(),
            },
            flags,
        })
    }
}
