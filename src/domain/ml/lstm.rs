//! Single-layer LSTM regressor (input 1, output 1).
//!
//! Gate order in the stacked weight matrices is input, forget, cell
//! candidate, output. Hidden and cell state start at zero on every call, so
//! the regressor is a pure function of the window it is given.

use crate::domain::errors::ForecastError;
use ndarray::{Array1, Array2, s};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Learned parameters. Also used as the gradient container, since gradients
/// have exactly the same shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmWeights {
    /// input -> gates [4H]
    pub w_ih: Array1<f64>,
    /// hidden -> gates [4H, H]
    pub w_hh: Array2<f64>,
    /// gate bias [4H]
    pub bias: Array1<f64>,
    /// hidden -> output [H]
    pub w_out: Array1<f64>,
    /// output bias [1]
    pub b_out: Array1<f64>,
}

pub type LstmGradients = LstmWeights;

impl LstmWeights {
    pub fn zeros(hidden_size: usize) -> Self {
        Self {
            w_ih: Array1::zeros(4 * hidden_size),
            w_hh: Array2::zeros((4 * hidden_size, hidden_size)),
            bias: Array1::zeros(4 * hidden_size),
            w_out: Array1::zeros(hidden_size),
            b_out: Array1::zeros(1),
        }
    }

    /// Uniform in ±1/sqrt(H) for every tensor.
    pub fn random<R: Rng>(hidden_size: usize, rng: &mut R) -> Self {
        let k = 1.0 / (hidden_size as f64).sqrt();
        let mut sample = || rng.random_range(-k..k);

        let w_ih = Array1::from_shape_fn(4 * hidden_size, |_| sample());
        let w_hh = Array2::from_shape_fn((4 * hidden_size, hidden_size), |_| sample());
        let bias = Array1::from_shape_fn(4 * hidden_size, |_| sample());
        let w_out = Array1::from_shape_fn(hidden_size, |_| sample());
        let b_out = Array1::from_shape_fn(1, |_| sample());

        Self {
            w_ih,
            w_hh,
            bias,
            w_out,
            b_out,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.w_out.len()
    }

    /// True when every tensor has the shape implied by `hidden_size`.
    pub fn is_consistent(&self, hidden_size: usize) -> bool {
        let gates = 4 * hidden_size;
        hidden_size > 0
            && self.w_ih.len() == gates
            && self.w_hh.dim() == (gates, hidden_size)
            && self.bias.len() == gates
            && self.w_out.len() == hidden_size
            && self.b_out.len() == 1
    }

    pub fn is_finite(&self) -> bool {
        self.values().all(|v| v.is_finite())
    }

    pub fn parameter_count(&self) -> usize {
        self.w_ih.len() + self.w_hh.len() + self.bias.len() + self.w_out.len() + self.b_out.len()
    }

    fn values(&self) -> impl Iterator<Item = &f64> {
        self.w_ih
            .iter()
            .chain(self.w_hh.iter())
            .chain(self.bias.iter())
            .chain(self.w_out.iter())
            .chain(self.b_out.iter())
    }

    /// Global L2 norm across all tensors.
    pub fn l2_norm(&self) -> f64 {
        self.values().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn scale(&mut self, factor: f64) {
        self.w_ih.mapv_inplace(|v| v * factor);
        self.w_hh.mapv_inplace(|v| v * factor);
        self.bias.mapv_inplace(|v| v * factor);
        self.w_out.mapv_inplace(|v| v * factor);
        self.b_out.mapv_inplace(|v| v * factor);
    }

    /// Rescale in place so the global norm does not exceed `max_norm`.
    /// Returns the norm measured before clipping.
    pub fn clip_norm(&mut self, max_norm: f64) -> f64 {
        let norm = self.l2_norm();
        let coef = max_norm / (norm + 1e-6);
        if coef < 1.0 {
            self.scale(coef);
        }
        norm
    }
}

/// Per-timestep activations kept for backpropagation through time.
struct StepCache {
    x: f64,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmRegressor {
    weights: LstmWeights,
}

impl LstmRegressor {
    pub fn new<R: Rng>(hidden_size: usize, rng: &mut R) -> Self {
        Self {
            weights: LstmWeights::random(hidden_size, rng),
        }
    }

    pub fn from_weights(weights: LstmWeights) -> Result<Self, ForecastError> {
        let hidden = weights.hidden_size();
        if !weights.is_consistent(hidden) {
            return Err(ForecastError::model(format!(
                "weight shapes inconsistent with hidden size {}",
                hidden
            )));
        }
        Ok(Self { weights })
    }

    pub fn hidden_size(&self) -> usize {
        self.weights.hidden_size()
    }

    pub fn weights(&self) -> &LstmWeights {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut LstmWeights {
        &mut self.weights
    }

    pub fn into_weights(self) -> LstmWeights {
        self.weights
    }

    fn step(&self, x: f64, h_prev: Array1<f64>, c_prev: Array1<f64>) -> StepCache {
        let hidden = self.hidden_size();
        let w = &self.weights;

        let z = &w.w_ih * x + w.w_hh.dot(&h_prev) + &w.bias;
        let i = z.slice(s![0..hidden]).mapv(sigmoid);
        let f = z.slice(s![hidden..2 * hidden]).mapv(sigmoid);
        let g = z.slice(s![2 * hidden..3 * hidden]).mapv(f64::tanh);
        let o = z.slice(s![3 * hidden..4 * hidden]).mapv(sigmoid);

        let c = &f * &c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);

        StepCache {
            x,
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            tanh_c,
        }
    }

    /// Run the window through the cell; returns the prediction, the final
    /// hidden state and the per-step caches.
    fn forward_cached(&self, window: &[f64]) -> (f64, Array1<f64>, Vec<StepCache>) {
        let hidden = self.hidden_size();
        let mut h = Array1::zeros(hidden);
        let mut c = Array1::zeros(hidden);
        let mut caches = Vec::with_capacity(window.len());

        for &x in window {
            let step = self.step(x, h, c);
            c = &step.f * &step.c_prev + &step.i * &step.g;
            h = &step.o * &step.tanh_c;
            caches.push(step);
        }

        let y = self.weights.w_out.dot(&h) + self.weights.b_out[0];
        (y, h, caches)
    }

    /// Single-value prediction for the next element after `window`.
    pub fn forward(&self, window: &[f64]) -> f64 {
        self.forward_cached(window).0
    }

    /// Squared error of the prediction against `target`.
    pub fn loss(&self, window: &[f64], target: f64) -> f64 {
        let diff = self.forward(window) - target;
        diff * diff
    }

    /// Squared error and its gradient with respect to every weight (BPTT).
    pub fn loss_and_gradients(&self, window: &[f64], target: f64) -> (f64, LstmGradients) {
        let hidden = self.hidden_size();
        let w = &self.weights;
        let (y, h_last, caches) = self.forward_cached(window);

        let diff = y - target;
        let dy = 2.0 * diff;

        let mut grads = LstmWeights::zeros(hidden);
        grads.w_out = &h_last * dy;
        grads.b_out[0] = dy;

        let mut dh = &w.w_out * dy;
        let mut dc_next = Array1::<f64>::zeros(hidden);

        for step in caches.iter().rev() {
            let d_o = &dh * &step.tanh_c;
            let dc = &dh * &step.o * &step.tanh_c.mapv(|t| 1.0 - t * t) + &dc_next;

            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            let mut dz = Array1::<f64>::zeros(4 * hidden);
            dz.slice_mut(s![0..hidden])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![hidden..2 * hidden])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * hidden..3 * hidden])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * hidden..4 * hidden])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_ih.scaled_add(step.x, &dz);
            grads.w_hh += &outer(&dz, &step.h_prev);
            grads.bias += &dz;

            dh = w.w_hh.t().dot(&dz);
        }

        (diff * diff, grads)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(r, c)| a[r] * b[c])
}
