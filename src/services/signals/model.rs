//! Recurrent sequence classifier (inference only).
//!
//! Architecture: stacked LSTM layers with progressively narrower hidden
//! widths, each followed by batch normalization (dropout is the identity at
//! inference), then a ReLU dense layer and a 3-way softmax output ordered
//! SELL, HOLD, BUY.
//!
//! The artifact is a JSON document produced by the training pipeline. It also
//! carries the min-max scaling fit during training so inference reuses it.

use crate::services::signals::features::{MinMaxScaler, SequenceWindow, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::types::Probabilities;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading or evaluating a classifier artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Feature column {position} is '{found}', expected '{expected}'")]
    FeatureMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid model shape: {0}")]
    Shape(String),
}

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Linear,
}

/// One LSTM layer.
///
/// Gate blocks are stacked in the order input, forget, candidate, output:
/// `w_input` is `[4 * units, input]`, `w_hidden` is `[4 * units, units]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub units: usize,
    pub w_input: Array2<f64>,
    pub w_hidden: Array2<f64>,
    pub bias: Array1<f64>,
}

impl LstmLayer {
    pub fn zeros(input: usize, units: usize) -> Self {
        Self {
            units,
            w_input: Array2::zeros((4 * units, input)),
            w_hidden: Array2::zeros((4 * units, units)),
            bias: Array1::zeros(4 * units),
        }
    }

    fn input_size(&self) -> usize {
        self.w_input.ncols()
    }

    fn validate(&self, input: usize) -> Result<(), ModelError> {
        let gates = 4 * self.units;
        if self.w_input.dim() != (gates, input)
            || self.w_hidden.dim() != (gates, self.units)
            || self.bias.len() != gates
        {
            return Err(ModelError::Shape(format!(
                "LSTM layer with {} units does not accept {} inputs",
                self.units, input
            )));
        }
        Ok(())
    }

    /// Run the whole sequence, returning the hidden state at every step.
    fn forward(&self, inputs: &Array2<f64>) -> Array2<f64> {
        let u = self.units;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut outputs = Array2::zeros((inputs.nrows(), u));

        for (t, x) in inputs.rows().into_iter().enumerate() {
            let z = self.w_input.dot(&x) + self.w_hidden.dot(&h) + &self.bias;
            let i_gate = z.slice(s![0..u]).mapv(sigmoid);
            let f_gate = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o_gate = z.slice(s![3 * u..4 * u]).mapv(sigmoid);

            c = &f_gate * &c + &i_gate * &g;
            h = &o_gate * &c.mapv(f64::tanh);
            outputs.row_mut(t).assign(&h);
        }

        outputs
    }
}

/// Batch normalization in inference form (moving statistics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
    pub moving_mean: Array1<f64>,
    pub moving_variance: Array1<f64>,
    pub epsilon: f64,
}

impl BatchNorm {
    /// Identity normalization for `units` features.
    pub fn identity(units: usize) -> Self {
        Self {
            gamma: Array1::ones(units),
            beta: Array1::zeros(units),
            moving_mean: Array1::zeros(units),
            moving_variance: Array1::ones(units),
            epsilon: 0.0,
        }
    }

    fn validate(&self, units: usize) -> Result<(), ModelError> {
        let lens = [
            self.gamma.len(),
            self.beta.len(),
            self.moving_mean.len(),
            self.moving_variance.len(),
        ];
        if lens.iter().any(|len| *len != units) {
            return Err(ModelError::Shape(format!(
                "batch normalization does not match {} units",
                units
            )));
        }
        Ok(())
    }

    fn apply(&self, values: &mut Array2<f64>) {
        let scale = &self.gamma / &self.moving_variance.mapv(|v| (v + self.epsilon).sqrt());
        for mut row in values.rows_mut() {
            let normalized = (&row - &self.moving_mean) * &scale + &self.beta;
            row.assign(&normalized);
        }
    }
}

/// Recurrent layer with its normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentBlock {
    pub lstm: LstmLayer,
    pub norm: BatchNorm,
}

/// Fully connected layer: `weights` is `[outputs, inputs]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn zeros(input: usize, output: usize, activation: Activation) -> Self {
        Self {
            weights: Array2::zeros((output, input)),
            bias: Array1::zeros(output),
            activation,
        }
    }

    fn validate(&self, input: usize) -> Result<(), ModelError> {
        if self.weights.ncols() != input || self.bias.len() != self.weights.nrows() {
            return Err(ModelError::Shape(format!(
                "dense layer {:?} does not accept {} inputs",
                self.weights.dim(),
                input
            )));
        }
        Ok(())
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        let z = self.weights.dot(x) + &self.bias;
        match self.activation {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z,
        }
    }
}

/// Serialized classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub lookback: usize,
    /// Feature column names in training order.
    pub feature_columns: Vec<String>,
    pub recurrent: Vec<RecurrentBlock>,
    pub hidden: DenseLayer,
    pub output: DenseLayer,
    /// Scaling fit on the training data.
    pub scaler: MinMaxScaler,
}

impl ModelArtifact {
    /// Artifact with the expected shapes and all-zero weights.
    pub fn zeroed(
        version: &str,
        lookback: usize,
        widths: &[usize],
        dense_units: usize,
        scaler: MinMaxScaler,
    ) -> Self {
        let mut input = FEATURE_COUNT;
        let recurrent = widths
            .iter()
            .map(|&units| {
                let block = RecurrentBlock {
                    lstm: LstmLayer::zeros(input, units),
                    norm: BatchNorm::identity(units),
                };
                input = units;
                block
            })
            .collect();

        Self {
            version: version.to_string(),
            lookback,
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            recurrent,
            hidden: DenseLayer::zeros(input, dense_units, Activation::Relu),
            output: DenseLayer::zeros(dense_units, 3, Activation::Linear),
            scaler,
        }
    }
}

/// Loaded, validated sequence classifier. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct SequenceClassifier {
    artifact: ModelArtifact,
}

impl SequenceClassifier {
    /// Validate an artifact and wrap it.
    pub fn new(artifact: ModelArtifact) -> Result<Self, ModelError> {
        Self::validate(&artifact)?;
        Ok(Self { artifact })
    }

    /// Load a JSON artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let artifact: ModelArtifact = serde_json::from_str(&data)?;
        let classifier = Self::new(artifact)?;
        info!(
            "Loaded sequence classifier {} from {}",
            classifier.version(),
            path.as_ref().display()
        );
        Ok(classifier)
    }

    fn validate(artifact: &ModelArtifact) -> Result<(), ModelError> {
        if artifact.feature_columns.len() != FEATURE_COUNT {
            return Err(ModelError::Shape(format!(
                "{} feature columns, expected {}",
                artifact.feature_columns.len(),
                FEATURE_COUNT
            )));
        }
        for (position, (found, expected)) in artifact
            .feature_columns
            .iter()
            .zip(FEATURE_COLUMNS.iter())
            .enumerate()
        {
            if found != expected {
                return Err(ModelError::FeatureMismatch {
                    position,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }

        if artifact.scaler.min.len() != FEATURE_COUNT || artifact.scaler.max.len() != FEATURE_COUNT {
            return Err(ModelError::Shape("scaler does not cover every feature".into()));
        }
        if artifact.lookback == 0 {
            return Err(ModelError::Shape("lookback must be positive".into()));
        }
        if artifact.recurrent.is_empty() {
            return Err(ModelError::Shape("no recurrent layers".into()));
        }

        let mut input = FEATURE_COUNT;
        for block in &artifact.recurrent {
            block.lstm.validate(input)?;
            block.norm.validate(block.lstm.units)?;
            input = block.lstm.units;
        }
        artifact.hidden.validate(input)?;
        artifact.output.validate(artifact.hidden.bias.len())?;
        if artifact.output.bias.len() != 3 {
            return Err(ModelError::Shape("output layer must have 3 classes".into()));
        }
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.artifact.version
    }

    pub fn lookback(&self) -> usize {
        self.artifact.lookback
    }

    /// Scaling parameters persisted with the artifact.
    pub fn scaler(&self) -> &MinMaxScaler {
        &self.artifact.scaler
    }

    /// Class probabilities for one window.
    pub fn classify(&self, window: &SequenceWindow) -> Result<Probabilities, ModelError> {
        let first_input = self.artifact.recurrent[0].lstm.input_size();
        if window.len() != self.artifact.lookback || window.values.ncols() != first_input {
            return Err(ModelError::Shape(format!(
                "window {:?} does not match [{}, {}]",
                window.values.dim(),
                self.artifact.lookback,
                first_input
            )));
        }

        let mut sequence = window.values.clone();
        for block in &self.artifact.recurrent {
            sequence = block.lstm.forward(&sequence);
            block.norm.apply(&mut sequence);
        }

        let last = sequence.row(sequence.nrows() - 1).to_owned();
        let hidden = self.artifact.hidden.forward(&last);
        let logits = self.artifact.output.forward(&hidden);
        let probs = softmax(&logits);

        Probabilities::from_slice(probs.as_slice().unwrap_or(&[]))
            .ok_or_else(|| ModelError::Shape("output is not a 3-way distribution".into()))
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exp = logits.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}
