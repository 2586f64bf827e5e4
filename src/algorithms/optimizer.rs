use crate::config::OptimizerKind;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use std::collections::HashMap;

/// Gradient-descent update rule. Parameters are addressed by a key so one
/// optimizer can hold per-table state for every tensor of a model.
pub trait Optimizer: Send {
    /// Advances the time step. Called once per mini-batch, before updates.
    fn step(&mut self) {}
    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>);
}

pub fn build_optimizer(kind: OptimizerKind, learning_rate: f64) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Adam => Box::new(Adam::new(learning_rate, 0.9, 0.999, 1e-7)),
        OptimizerKind::AdaGrad => Box::new(AdaGrad::new(learning_rate, 1e-7)),
    }
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: HashMap<String, ArrayD<f32>>,
    v: HashMap<String, ArrayD<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: HashMap::new(),
            v: HashMap::new(),
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-7)
    }
}

impl Optimizer for Adam {
    fn step(&mut self) {
        self.t += 1;
    }

    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>) {
        let t = self.t.max(1);
        let beta1 = self.beta1 as f32;
        let beta2 = self.beta2 as f32;
        let epsilon = self.epsilon as f32;
        let learning_rate = self.learning_rate as f32;
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);

        let m = self
            .m
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(params.raw_dim()));
        let v = self
            .v
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(params.raw_dim()));

        Zip::from(params)
            .and(m)
            .and(v)
            .and(&gradients)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }
}

#[derive(Debug, Clone)]
pub struct AdaGrad {
    learning_rate: f64,
    epsilon: f64,
    sum_squared_gradients: HashMap<String, ArrayD<f32>>,
}

impl AdaGrad {
    pub fn new(learning_rate: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            epsilon,
            sum_squared_gradients: HashMap::new(),
        }
    }
}

impl Default for AdaGrad {
    fn default() -> Self {
        Self::new(0.01, 1e-7)
    }
}

impl Optimizer for AdaGrad {
    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>) {
        let learning_rate = self.learning_rate as f32;
        let epsilon = self.epsilon as f32;
        let sum_sq_grad = self
            .sum_squared_gradients
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(params.raw_dim()));

        Zip::from(params)
            .and(sum_sq_grad)
            .and(&gradients)
            .for_each(|p, acc, &g| {
                *acc += g * g;
                *p -= learning_rate * g / (acc.sqrt() + epsilon);
            });
    }
}
