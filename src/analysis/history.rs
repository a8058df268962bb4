//! Fixed-capacity FIFO of instant energy samples for one group.

use std::collections::VecDeque;

/// Most recent `capacity` energy samples of a group, oldest first
#[derive(Debug, Clone)]
pub struct BandEnergyHistory {
    samples: VecDeque<f32>,
    capacity: usize,
    average: f32,
}

impl BandEnergyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            average: 0.0,
        }
    }

    /// Append a sample, evicting the oldest once full, and recompute the mean
    pub fn push(&mut self, energy: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(energy);

        // Full recompute over the window, not an incremental estimate
        let sum: f32 = self.samples.iter().sum();
        self.average = sum / self.samples.len() as f32;
    }

    /// Arithmetic mean of the stored samples (0 while empty)
    pub fn average(&self) -> f32 {
        self.average
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn oldest(&self) -> Option<f32> {
        self.samples.front().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.samples.iter()
    }
}
