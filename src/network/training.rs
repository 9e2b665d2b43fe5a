//! Training and testing loops
//!
//! Training is synchronous: each iteration (forward, backward, and on a
//! mini-batch boundary an update) completes before the next starts. A caller
//! that needs to stop early returns [`ControlFlow::Break`] from the
//! per-iteration callback.

use crate::error::{NetError, Result};
use crate::network::Network;
use log::info;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

/// One record of a dataset. `expected` and `output` are synonyms for the
/// target; `expected` wins when both are present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingExample {
    pub input: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<f64>>,
}

impl TrainingExample {
    pub fn new(input: Vec<f64>, expected: Vec<f64>) -> Self {
        Self {
            input,
            expected: Some(expected),
            output: None,
        }
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.expected.as_deref().or(self.output.as_deref())
    }
}

/// What the per-iteration callback sees.
#[derive(Debug, Clone, Copy)]
pub struct TrainingEvent<'a> {
    /// Iterations completed by the network, this one included.
    pub iteration: usize,
    pub epoch: usize,
    /// Cost of this iteration's output.
    pub error: f64,
    pub elapsed: Duration,
    pub input: &'a [f64],
}

/// What the per-record testing callback sees.
#[derive(Debug, Clone, Copy)]
pub struct TestEvent<'a> {
    pub index: usize,
    pub error: f64,
    pub elapsed: Duration,
    pub input: &'a [f64],
}

type Callback<'a> = Box<dyn FnMut(&TrainingEvent<'_>) -> ControlFlow<()> + 'a>;

pub struct TrainingOptions<'a> {
    pub epochs: usize,
    pub mini_batch_size: usize,
    pub shuffle: bool,
    /// Log the average error of every epoch at info level.
    pub log: bool,
    callback: Option<Callback<'a>>,
}

impl Default for TrainingOptions<'_> {
    fn default() -> Self {
        Self {
            epochs: 1,
            mini_batch_size: 1,
            shuffle: false,
            log: false,
            callback: None,
        }
    }
}

impl<'a> TrainingOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_mini_batch_size(mut self, size: usize) -> Self {
        self.mini_batch_size = size;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Called after every iteration; returning `Break` stops training.
    pub fn with_callback(
        mut self,
        callback: impl FnMut(&TrainingEvent<'_>) -> ControlFlow<()> + 'a,
    ) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingReport {
    /// Epochs completed in this call.
    pub epochs: usize,
    /// Iterations run in this call.
    pub iterations: usize,
    pub last_epoch_error: Option<f64>,
    /// Average cost per completed epoch.
    pub epoch_errors: Vec<f64>,
    pub elapsed: Duration,
    /// Whether the callback stopped training early.
    pub halted: bool,
}

impl Network {
    /// Train on `data`, initialising the layers from the first record if needed.
    ///
    /// Fails with [`NetError::DataContract`] before any iteration if a record
    /// has no target.
    ///
    /// # Example
    ///
    /// ```
    /// use layered_networks::config::NetworkConfig;
    /// use layered_networks::network::{Network, TrainingExample, TrainingOptions};
    ///
    /// let data = vec![
    ///     TrainingExample::new(vec![0.0, 1.0], vec![1.0]),
    ///     TrainingExample::new(vec![1.0, 0.0], vec![0.0]),
    /// ];
    /// let mut net = Network::new(NetworkConfig::default()).unwrap();
    /// let report = net.train(&data, TrainingOptions::new().with_epochs(5)).unwrap();
    /// assert_eq!(report.iterations, 10);
    /// ```
    pub fn train(
        &mut self,
        data: &[TrainingExample],
        mut options: TrainingOptions,
    ) -> Result<TrainingReport> {
        let first = data.first().ok_or(NetError::EmptyDataset)?;
        let targets = collect_targets(data)?;
        if options.mini_batch_size == 0 {
            return Err(NetError::config("mini-batch size must be at least 1"));
        }

        self.init_layers_for(first.input.len(), targets[0].len())?;
        self.mini_batch_size = options.mini_batch_size;
        self.training = true;
        let result = self.run_epochs(data, &targets, &mut options);
        self.training = false;
        result
    }

    fn run_epochs(
        &mut self,
        data: &[TrainingExample],
        targets: &[&[f64]],
        options: &mut TrainingOptions,
    ) -> Result<TrainingReport> {
        let start = Instant::now();
        let mut report = TrainingReport::default();
        let mut order: Vec<usize> = (0..data.len()).collect();

        'epochs: for _ in 0..options.epochs {
            if options.shuffle {
                self.rng.shuffle(&mut order);
            }
            self.reset_delta_weights();
            let mut epoch_error = 0.0;
            let mut pending = 0;

            for (position, &index) in order.iter().enumerate() {
                let record = &data[index];
                let output = self.forward(&record.input)?;
                self.backward(targets[index])?;
                let error = self.config.cost.evaluate(targets[index], &output);
                epoch_error += error;
                self.iterations += 1;
                report.iterations += 1;
                pending += 1;

                if pending == options.mini_batch_size || position + 1 == order.len() {
                    self.apply_delta_weights()?;
                    self.reset_delta_weights();
                    pending = 0;
                }

                if let Some(callback) = options.callback.as_mut() {
                    let event = TrainingEvent {
                        iteration: self.iterations,
                        epoch: self.epochs,
                        error,
                        elapsed: start.elapsed(),
                        input: &record.input,
                    };
                    if callback(&event).is_break() {
                        if pending > 0 {
                            self.apply_delta_weights()?;
                            self.reset_delta_weights();
                        }
                        report.halted = true;
                        break 'epochs;
                    }
                }
            }

            let average = epoch_error / data.len() as f64;
            self.epochs += 1;
            self.last_epoch_error = Some(average);
            report.epochs += 1;
            report.epoch_errors.push(average);
            if options.log {
                info!(
                    "Epoch {}: error {:.6} ({:.2?} elapsed)",
                    self.epochs,
                    average,
                    start.elapsed()
                );
            }
        }

        report.last_epoch_error = report.epoch_errors.last().copied();
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Average cost over `data` without touching any parameter.
    pub fn test(&mut self, data: &[TrainingExample]) -> Result<f64> {
        self.test_with(data, |_| {})
    }

    /// Like [`Network::test`], calling `callback` after every record.
    pub fn test_with(
        &mut self,
        data: &[TrainingExample],
        mut callback: impl FnMut(&TestEvent<'_>),
    ) -> Result<f64> {
        self.ensure_initialised()?;
        if data.is_empty() {
            return Err(NetError::EmptyDataset);
        }
        let targets = collect_targets(data)?;
        let start = Instant::now();
        let was_training = std::mem::replace(&mut self.training, false);

        let mut total = 0.0;
        for (index, record) in data.iter().enumerate() {
            let output = match self.forward(&record.input) {
                Ok(output) => output,
                Err(e) => {
                    self.training = was_training;
                    return Err(e);
                }
            };
            let error = self.config.cost.evaluate(targets[index], &output);
            total += error;
            callback(&TestEvent {
                index,
                error,
                elapsed: start.elapsed(),
                input: &record.input,
            });
        }
        self.training = was_training;
        Ok(total / data.len() as f64)
    }
}

fn collect_targets(data: &[TrainingExample]) -> Result<Vec<&[f64]>> {
    data.iter()
        .enumerate()
        .map(|(index, record)| record.target().ok_or(NetError::DataContract { index }))
        .collect()
}
