use std::{fmt, str::FromStr};

use tch::{
    Tensor,
    nn::{self, OptimizerConfig, VarStore},
};

use crate::error::{Error, Result};

/// The optimizers a training run can select by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Sgd,
    Adam,
    Adagrad,
    Adadelta,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 4] = [
        OptimizerKind::Sgd,
        OptimizerKind::Adam,
        OptimizerKind::Adagrad,
        OptimizerKind::Adadelta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Adam => "adam",
            OptimizerKind::Adagrad => "adagrad",
            OptimizerKind::Adadelta => "adadelta",
        }
    }
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        OptimizerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnsupportedOptimizer(name.to_string()))
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An optimizer kind together with its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerSettings {
    Sgd {
        learning_rate: f64,
    },
    Adam {
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        eps: f64,
    },
    Adagrad {
        learning_rate: f64,
        initial_accumulator: f64,
        eps: f64,
    },
    Adadelta {
        learning_rate: f64,
        rho: f64,
        eps: f64,
    },
}

impl OptimizerSettings {
    /// Settings for `kind` with the usual defaults for everything but the learning rate.
    pub fn new(kind: OptimizerKind, learning_rate: f64) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerSettings::Sgd { learning_rate },
            OptimizerKind::Adam => OptimizerSettings::Adam {
                learning_rate,
                beta1: 0.9,
                beta2: 0.999,
                eps: 1e-8,
            },
            OptimizerKind::Adagrad => OptimizerSettings::Adagrad {
                learning_rate,
                initial_accumulator: 0.1,
                eps: 1e-7,
            },
            OptimizerKind::Adadelta => OptimizerSettings::Adadelta {
                learning_rate,
                rho: 0.95,
                eps: 1e-6,
            },
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerSettings::Sgd { .. } => OptimizerKind::Sgd,
            OptimizerSettings::Adam { .. } => OptimizerKind::Adam,
            OptimizerSettings::Adagrad { .. } => OptimizerKind::Adagrad,
            OptimizerSettings::Adadelta { .. } => OptimizerKind::Adadelta,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerSettings::Sgd { learning_rate }
            | OptimizerSettings::Adam { learning_rate, .. }
            | OptimizerSettings::Adagrad { learning_rate, .. }
            | OptimizerSettings::Adadelta { learning_rate, .. } => learning_rate,
        }
    }

    /// Creates an optimizer over every trainable variable of `var_store`.
    /// Variables must be created before calling this.
    pub fn build(&self, var_store: &VarStore) -> Result<Optimizer> {
        let optimizer = match *self {
            OptimizerSettings::Sgd { learning_rate } => {
                let inner = nn::Sgd::default().build(var_store, learning_rate)?;
                Optimizer::Torch {
                    kind: OptimizerKind::Sgd,
                    inner,
                }
            }
            OptimizerSettings::Adam {
                learning_rate,
                beta1,
                beta2,
                eps,
            } => {
                let mut config = nn::adam(beta1, beta2, 0.0);
                config.eps = eps;
                let inner = config.build(var_store, learning_rate)?;
                Optimizer::Torch {
                    kind: OptimizerKind::Adam,
                    inner,
                }
            }
            OptimizerSettings::Adagrad {
                learning_rate,
                initial_accumulator,
                eps,
            } => Optimizer::Adagrad(Adagrad::new(
                var_store.trainable_variables(),
                learning_rate,
                initial_accumulator,
                eps,
            )),
            OptimizerSettings::Adadelta {
                learning_rate,
                rho,
                eps,
            } => Optimizer::Adadelta(Adadelta::new(
                var_store.trainable_variables(),
                learning_rate,
                rho,
                eps,
            )),
        };
        Ok(optimizer)
    }
}

/// A built optimizer. SGD and Adam come from `tch`; Adagrad and Adadelta
/// apply their update rules to the variables directly.
pub enum Optimizer {
    Torch {
        kind: OptimizerKind,
        inner: nn::Optimizer,
    },
    Adagrad(Adagrad),
    Adadelta(Adadelta),
}

impl Optimizer {
    pub fn kind(&self) -> OptimizerKind {
        match self {
            Optimizer::Torch { kind, .. } => *kind,
            Optimizer::Adagrad(_) => OptimizerKind::Adagrad,
            Optimizer::Adadelta(_) => OptimizerKind::Adadelta,
        }
    }

    pub fn set_lr(&mut self, learning_rate: f64) {
        match self {
            Optimizer::Torch { inner, .. } => inner.set_lr(learning_rate),
            Optimizer::Adagrad(adagrad) => adagrad.learning_rate = learning_rate,
            Optimizer::Adadelta(adadelta) => adadelta.learning_rate = learning_rate,
        }
    }

    pub fn zero_grad(&mut self) {
        match self {
            Optimizer::Torch { inner, .. } => inner.zero_grad(),
            Optimizer::Adagrad(adagrad) => zero_grads(&adagrad.variables),
            Optimizer::Adadelta(adadelta) => zero_grads(&adadelta.variables),
        }
    }

    /// Applies one update from the gradients currently stored on the variables.
    pub fn step(&mut self) {
        match self {
            Optimizer::Torch { inner, .. } => inner.step(),
            Optimizer::Adagrad(adagrad) => adagrad.step(),
            Optimizer::Adadelta(adadelta) => adadelta.step(),
        }
    }

    /// Zeroes gradients, backpropagates `loss` and applies one update.
    pub fn backward_step(&mut self, loss: &Tensor) {
        self.zero_grad();
        loss.backward();
        self.step();
    }

    /// Like [`Optimizer::backward_step`], rescaling the gradients first so
    /// their global L2 norm is at most `max_norm`.
    pub fn backward_step_clip_norm(&mut self, loss: &Tensor, max_norm: f64) -> Result<()> {
        if let Optimizer::Torch { inner, .. } = self {
            inner.backward_step_clip_norm(loss, max_norm);
            return Ok(());
        }
        self.zero_grad();
        loss.backward();
        clip_grad_norm(self.variables(), max_norm)?;
        self.step();
        Ok(())
    }

    /// Variables updated by the optimizers implemented here; `tch` keeps its own.
    fn variables(&self) -> &[Tensor] {
        match self {
            Optimizer::Torch { .. } => &[],
            Optimizer::Adagrad(adagrad) => &adagrad.variables,
            Optimizer::Adadelta(adadelta) => &adadelta.variables,
        }
    }
}

fn zero_grads(variables: &[Tensor]) {
    for variable in variables {
        let mut grad = variable.grad();
        if grad.defined() {
            let _ = grad.zero_();
        }
    }
}

/// Scales all gradients by `max_norm / total_norm` when the total exceeds
/// `max_norm`. Returns the norm before clipping.
fn clip_grad_norm(variables: &[Tensor], max_norm: f64) -> Result<f64> {
    let mut squared = 0.0;
    for variable in variables {
        let grad = variable.grad();
        if grad.defined() {
            let norm = f64::try_from(&grad.norm())?;
            squared += norm * norm;
        }
    }
    let total_norm = squared.sqrt();
    if total_norm > max_norm {
        let scale = max_norm / (total_norm + 1e-6);
        tch::no_grad(|| {
            for variable in variables {
                let mut grad = variable.grad();
                if grad.defined() {
                    let scaled = &grad * scale;
                    grad.copy_(&scaled);
                }
            }
        });
    }
    Ok(total_norm)
}

/// Adagrad: `acc += g^2; w -= lr * g / (sqrt(acc) + eps)`.
pub struct Adagrad {
    variables: Vec<Tensor>,
    accumulators: Vec<Tensor>,
    learning_rate: f64,
    eps: f64,
}

impl Adagrad {
    fn new(variables: Vec<Tensor>, learning_rate: f64, initial_accumulator: f64, eps: f64) -> Self {
        let accumulators: Vec<Tensor> = tch::no_grad(|| {
            variables
                .iter()
                .map(|v| v.ones_like() * initial_accumulator)
                .collect()
        });
        Adagrad {
            variables,
            accumulators,
            learning_rate,
            eps,
        }
    }

    fn step(&mut self) {
        tch::no_grad(|| {
            for (variable, acc) in self.variables.iter_mut().zip(self.accumulators.iter_mut()) {
                let grad = variable.grad();
                if !grad.defined() {
                    continue;
                }
                *acc = &*acc + &grad * &grad;
                let update = &grad * self.learning_rate / (acc.sqrt() + self.eps);
                let updated = &*variable - update;
                variable.copy_(&updated);
            }
        });
    }
}

/// Adadelta:
/// `acc = rho * acc + (1 - rho) * g^2`,
/// `u = sqrt(acc_u + eps) / sqrt(acc + eps) * g`,
/// `acc_u = rho * acc_u + (1 - rho) * u^2`,
/// `w -= lr * u`.
pub struct Adadelta {
    variables: Vec<Tensor>,
    grad_accumulators: Vec<Tensor>,
    update_accumulators: Vec<Tensor>,
    learning_rate: f64,
    rho: f64,
    eps: f64,
}

impl Adadelta {
    fn new(variables: Vec<Tensor>, learning_rate: f64, rho: f64, eps: f64) -> Self {
        let (grad_accumulators, update_accumulators): (Vec<Tensor>, Vec<Tensor>) =
            tch::no_grad(|| {
                variables
                    .iter()
                    .map(|v| (v.zeros_like(), v.zeros_like()))
                    .unzip()
            });
        Adadelta {
            variables,
            grad_accumulators,
            update_accumulators,
            learning_rate,
            rho,
            eps,
        }
    }

    fn step(&mut self) {
        let (rho, eps) = (self.rho, self.eps);
        tch::no_grad(|| {
            let state = self
                .variables
                .iter_mut()
                .zip(self.grad_accumulators.iter_mut())
                .zip(self.update_accumulators.iter_mut());
            for ((variable, acc), acc_update) in state {
                let grad = variable.grad();
                if !grad.defined() {
                    continue;
                }
                *acc = &*acc * rho + &grad * &grad * (1.0 - rho);
                let update = (&*acc_update + eps).sqrt() / (&*acc + eps).sqrt() * &grad;
                *acc_update = &*acc_update * rho + &update * &update * (1.0 - rho);
                let updated = &*variable - update * self.learning_rate;
                variable.copy_(&updated);
            }
        });
    }
}
