//! Fully connected tanh network `R -> R` evaluated on Taylor jets.
//!
//! Forward: every neuron carries a [`Jet`], so one pass yields the output together with its first
//! and second derivative with respect to the input.
//! Backward: reverse accumulation through the jet arithmetic, giving the gradient of any scalar
//! built from the output jet with respect to all weights and biases.
//!
//! Flat parameter layout, layer after layer: weights (column-major), then biases.
use crate::numerical::PINN::jet::Jet;
use crate::numerical::solver_errors::{CorneaError, CorneaResult};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, rngs::StdRng};

#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// n_out x n_in
    pub weights: DMatrix<f64>,
    pub bias: DVector<f64>,
}

impl DenseLayer {
    /// Xavier-uniform weights, zero biases
    pub fn xavier(n_in: usize, n_out: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (n_in + n_out) as f64).sqrt();
        let weights = DMatrix::from_fn(n_out, n_in, |_, _| rng.random_range(-limit..limit));
        Self {
            weights,
            bias: DVector::zeros(n_out),
        }
    }

    pub fn n_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// z = W a + c, applied componentwise to the jets
    fn forward(&self, input: &[Jet]) -> Vec<Jet> {
        (0..self.weights.nrows())
            .map(|i| {
                input
                    .iter()
                    .enumerate()
                    .fold(Jet::constant(self.bias[i]), |acc, (j, a)| {
                        acc + *a * self.weights[(i, j)]
                    })
            })
            .collect()
    }
}

/// intermediate jets recorded by [`Mlp::forward_taped`]
#[derive(Debug, Clone)]
pub struct Tape {
    /// input of every layer
    inputs: Vec<Vec<Jet>>,
    /// pre-activations of the hidden layers
    pre_activations: Vec<Vec<Jet>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<DenseLayer>,
}

impl Mlp {
    /// scalar input, `hidden` tanh layers, linear scalar output
    pub fn new(hidden: &[usize], rng: &mut StdRng) -> Self {
        let mut sizes = vec![1];
        sizes.extend_from_slice(hidden);
        sizes.push(1);
        let layers = sizes
            .windows(2)
            .map(|w| DenseLayer::xavier(w[0], w[1], rng))
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn n_parameters(&self) -> usize {
        self.layers.iter().map(|l| l.n_parameters()).sum()
    }

    pub fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.n_parameters());
        for layer in &self.layers {
            params.extend_from_slice(layer.weights.as_slice());
            params.extend_from_slice(layer.bias.as_slice());
        }
        params
    }

    pub fn set_parameters(&mut self, params: &[f64]) -> CorneaResult<()> {
        if params.len() != self.n_parameters() {
            return Err(CorneaError::InvalidParameters(format!(
                "network has {} parameters, got {}",
                self.n_parameters(),
                params.len()
            )));
        }
        let mut offset = 0;
        for layer in &mut self.layers {
            let nw = layer.weights.len();
            layer
                .weights
                .as_mut_slice()
                .copy_from_slice(&params[offset..offset + nw]);
            offset += nw;
            let nb = layer.bias.len();
            layer
                .bias
                .as_mut_slice()
                .copy_from_slice(&params[offset..offset + nb]);
            offset += nb;
        }
        Ok(())
    }

    pub fn forward(&self, x: Jet) -> Jet {
        let last = self.layers.len() - 1;
        let mut a = vec![x];
        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&a);
            if l == last {
                return z[0];
            }
            a = z.into_iter().map(Jet::tanh).collect();
        }
        a[0]
    }

    pub fn forward_taped(&self, x: Jet) -> (Jet, Tape) {
        let last = self.layers.len() - 1;
        let mut tape = Tape {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(last),
        };
        let mut a = vec![x];
        let mut out = Jet::default();
        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&a);
            tape.inputs.push(a);
            if l == last {
                out = z[0];
                break;
            }
            a = z.iter().map(|z| z.tanh()).collect();
            tape.pre_activations.push(z);
        }
        (out, tape)
    }

    /// Adds `d(phi)/d(theta)` to `grad`, where `g_out = d(phi)/d(output jet)`.
    pub fn backward(&self, tape: &Tape, g_out: Jet, grad: &mut [f64]) {
        let mut offsets = Vec::with_capacity(self.layers.len());
        let mut offset = 0;
        for layer in &self.layers {
            offsets.push(offset);
            offset += layer.n_parameters();
        }

        let mut gz = vec![g_out];
        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let a = &tape.inputs[l];
            let rows = layer.weights.nrows();
            let off = offsets[l];
            for (j, aj) in a.iter().enumerate() {
                for (i, gi) in gz.iter().enumerate() {
                    grad[off + j * rows + i] += gi.v * aj.v + gi.d1 * aj.d1 + gi.d2 * aj.d2;
                }
            }
            let bias_off = off + layer.weights.len();
            for (i, gi) in gz.iter().enumerate() {
                grad[bias_off + i] += gi.v;
            }
            if l > 0 {
                let ga = (0..a.len()).map(|j| {
                    gz.iter()
                        .enumerate()
                        .fold(Jet::default(), |acc, (i, gi)| acc + *gi * layer.weights[(i, j)])
                });
                gz = tape.pre_activations[l - 1]
                    .iter()
                    .zip(ga)
                    .map(|(z, g)| z.tanh_backward(g))
                    .collect();
            }
        }
    }
}
