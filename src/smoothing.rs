//! Per-signal smoothing of raw landmark coordinates.

use std::collections::VecDeque;

/// Moving-average window over one scalar signal.
#[derive(Debug, Clone, Default)]
pub struct MovingAverage {
    history: VecDeque<f64>,
}

impl MovingAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `value`, drop the oldest samples beyond `window`, return the mean
    /// of what is left. A window of 0 is treated as 1.
    pub fn push(&mut self, value: f64, window: usize) -> f64 {
        let window = window.max(1);
        self.history.push_back(value);
        while self.history.len() > window {
            self.history.pop_front();
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.history.len()
    }
}

/// `factor * new + (1 - factor) * previous`.
pub fn exponential(previous: f64, new: f64, factor: f64) -> f64 {
    factor * new + (1.0 - factor) * previous
}

/// Exponential filter that passes its first sample through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential {
    last: Option<f64>,
}

impl Exponential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, factor: f64) -> f64 {
        let out = match self.last {
            Some(prev) => exponential(prev, value, factor),
            None => value,
        };
        self.last = Some(out);
        out
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}
