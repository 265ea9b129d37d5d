//! Learning-rate schedule: linear warmup, then plateau decay.
//!
//! The rate ramps linearly from zero to the base rate over the first
//! `warmup` steps. After warmup the rate only ever shrinks: each run of
//! `lr_patience` consecutive non-improving validations multiplies it by
//! `factor`, floored at `min_lr`, so the post-warmup schedule is
//! monotonically non-increasing.

/// Warmup + plateau-decay learning rate schedule.
#[derive(Debug, Clone)]
pub struct LrSchedule {
    base_lr: f64,
    warmup: usize,
    factor: f64,
    lr_patience: usize,
    min_lr: f64,
    decay_mult: f64,
    bad_validations: usize,
}

impl LrSchedule {
    /// Schedule with the plateau parameters used for pretraining runs
    /// (decay 0.8 after 5 flat validations, floor 1e-7).
    pub fn new(base_lr: f64, warmup: usize) -> Self {
        Self::with_decay(base_lr, warmup, 0.8, 5, 1.0e-7)
    }

    pub fn with_decay(
        base_lr: f64,
        warmup: usize,
        factor: f64,
        lr_patience: usize,
        min_lr: f64,
    ) -> Self {
        Self {
            base_lr,
            warmup,
            factor,
            lr_patience,
            min_lr,
            decay_mult: 1.0,
            bad_validations: 0,
        }
    }

    /// Learning rate at global step `step` (0-based).
    pub fn rate_at(&self, step: usize) -> f64 {
        if step < self.warmup {
            self.base_lr * (step + 1) as f64 / self.warmup as f64
        } else {
            (self.base_lr * self.decay_mult).max(self.min_lr)
        }
    }

    /// Feeds one epoch's validation outcome into the plateau decay.
    pub fn observe_validation(&mut self, improved: bool) {
        if improved {
            self.bad_validations = 0;
            return;
        }
        self.bad_validations += 1;
        if self.bad_validations >= self.lr_patience {
            self.decay_mult *= self.factor;
            self.bad_validations = 0;
        }
    }
}
