use crate::domain::ml::LstmWeights;
use ndarray::{Array, Dimension, Zip};

/// Adam with bias correction, one moment pair per weight tensor.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m: LstmWeights,
    v: LstmWeights,
}

struct StepParams {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    bias1: f64,
    bias2: f64,
}

impl Adam {
    pub fn new(learning_rate: f64, hidden_size: usize) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            m: LstmWeights::zeros(hidden_size),
            v: LstmWeights::zeros(hidden_size),
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.step
    }

    pub fn step(&mut self, params: &mut LstmWeights, grads: &LstmWeights) {
        self.step = self.step.saturating_add(1);
        let hp = StepParams {
            lr: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            bias1: 1.0 - self.beta1.powi(self.step),
            bias2: 1.0 - self.beta2.powi(self.step),
        };

        update(&mut params.w_ih, &grads.w_ih, &mut self.m.w_ih, &mut self.v.w_ih, &hp);
        update(&mut params.w_hh, &grads.w_hh, &mut self.m.w_hh, &mut self.v.w_hh, &hp);
        update(&mut params.bias, &grads.bias, &mut self.m.bias, &mut self.v.bias, &hp);
        update(&mut params.w_out, &grads.w_out, &mut self.m.w_out, &mut self.v.w_out, &hp);
        update(&mut params.b_out, &grads.b_out, &mut self.m.b_out, &mut self.v.b_out, &hp);
    }
}

fn update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    hp: &StepParams,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = hp.beta1 * *m + (1.0 - hp.beta1) * g;
            *v = hp.beta2 * *v + (1.0 - hp.beta2) * g * g;
            let m_hat = *m / hp.bias1;
            let v_hat = *v / hp.bias2;
            *p -= hp.lr * m_hat / (v_hat.sqrt() + hp.epsilon);
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        // With bias correction the first Adam step is lr * sign(g).
        let mut params = LstmWeights::zeros(2);
        let mut grads = LstmWeights::zeros(2);
        grads.b_out[0] = 0.5;
        grads.w_out[1] = -3.0;

        let mut adam = Adam::new(0.01, 2);
        adam.step(&mut params, &grads);

        assert!((params.b_out[0] + 0.01).abs() < 1e-6);
        assert!((params.w_out[1] - 0.01).abs() < 1e-6);
        assert_eq!(params.w_out[0], 0.0);
        assert_eq!(adam.steps_taken(), 1);
    }

    #[test]
    fn test_zero_learning_rate_freezes_weights() {
        let mut params = LstmWeights::zeros(3);
        params.bias[2] = 0.25;
        let before = params.clone();

        let mut grads = LstmWeights::zeros(3);
        grads.bias.fill(1.0);
        grads.w_hh.fill(-0.5);

        let mut adam = Adam::new(0.0, 3);
        for _ in 0..10 {
            adam.step(&mut params, &grads);
        }
        assert_eq!(params, before);
    }

    #[test]
    fn test_descends_simple_quadratic() {
        // minimise (b - 3)^2 through the output bias
        let mut params = LstmWeights::zeros(1);
        let mut adam = Adam::new(0.1, 1);
        for _ in 0..500 {
            let mut grads = LstmWeights::zeros(1);
            grads.b_out[0] = 2.0 * (params.b_out[0] - 3.0);
            adam.step(&mut params, &grads);
        }
        assert!((params.b_out[0] - 3.0).abs() < 0.05);
    }
}
