use rand::{Rng, RngCore};
use serde::Serialize;
use thiserror::Error;

// This file contains the feed-forward network that steers every unit.
// The network is never trained: every weight and bias is drawn once from [-1.0, 1.0]
// when the owning unit is spawned and stays fixed until the unit is dropped.
//-----------------------------------------------------------------------------------------------------
// Diagram (the {4, 6, 2} topology used by the units):
//
//  distance / 800 ->      [6 tanh neurons]      [2 tanh neurons] -> speed / 5
//  angle / PI     ->>>>   (hidden layer)   ---> (output layer)   -> direction / PI
//  speed / 5      ->
//  0.0            ->
//
// Each neuron computes tanh(bias + sum(inputs[i] * weights[i])), and the outputs of one
// layer become the inputs of the next.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("a topology needs at least 2 layer widths, got {0}")]
    TooFewLayers(usize),
    #[error("layer {layer} has no neurons")]
    EmptyLayer { layer: usize },
    #[error("neuron {neuron} expects {found} inputs but its layer expects {expected}")]
    MixedInputWidths {
        neuron: usize,
        expected: usize,
        found: usize,
    },
    #[error("layer {layer} expects {found} inputs but the previous layer produces {expected}")]
    WidthMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },
}

/// Ordered layer widths. Element 0 is the input width, it has no neurons of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology(Vec<usize>);

impl Topology {
    pub fn new(widths: Vec<usize>) -> Result<Self, NetworkError> {
        if widths.len() < 2 {
            return Err(NetworkError::TooFewLayers(widths.len()));
        }
        if let Some(layer) = widths.iter().position(|&w| w == 0) {
            return Err(NetworkError::EmptyLayer { layer });
        }
        Ok(Self(widths))
    }

    pub fn widths(&self) -> &[usize] {
        &self.0
    }

    pub fn inputs(&self) -> usize {
        self.0[0]
    }

    pub fn outputs(&self) -> usize {
        self.0[self.0.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neuron {
    weights: Vec<f32>,
    bias: f32,
}

impl Neuron {
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    pub fn random(inputs: usize, rng: &mut dyn RngCore) -> Self {
        let weights = (0..inputs).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        let bias = rng.gen_range(-1.0..=1.0);
        Self { weights, bias }
    }

    pub fn input_width(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// tanh(bias + inputs · weights)
    ///
    /// Panics if `inputs` is not exactly as long as the weight vector.
    pub fn activate(&self, inputs: &[f32]) -> f32 {
        assert_eq!(
            inputs.len(),
            self.weights.len(),
            "neuron fed {} inputs but holds {} weights",
            inputs.len(),
            self.weights.len()
        );
        let sum = inputs
            .iter()
            .zip(&self.weights)
            .fold(self.bias, |acc, (input, weight)| acc + input * weight);
        sum.tanh()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(neurons: Vec<Neuron>) -> Result<Self, NetworkError> {
        let expected = match neurons.first() {
            Some(neuron) => neuron.input_width(),
            None => return Err(NetworkError::EmptyLayer { layer: 0 }),
        };
        if let Some((neuron, found)) = neurons
            .iter()
            .map(Neuron::input_width)
            .enumerate()
            .find(|&(_, width)| width != expected)
        {
            return Err(NetworkError::MixedInputWidths {
                neuron,
                expected,
                found,
            });
        }
        Ok(Self { neurons })
    }

    fn random(inputs: usize, outputs: usize, rng: &mut dyn RngCore) -> Self {
        let neurons = (0..outputs).map(|_| Neuron::random(inputs, rng)).collect();
        Self { neurons }
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn input_width(&self) -> usize {
        self.neurons[0].input_width()
    }

    pub fn output_width(&self) -> usize {
        self.neurons.len()
    }

    pub fn propagate(&self, inputs: &[f32]) -> Vec<f32> {
        self.neurons
            .iter()
            .map(|neuron| neuron.activate(inputs))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// One layer per adjacent pair of widths, every parameter drawn uniformly from [-1.0, 1.0].
    pub fn random(topology: &Topology, rng: &mut dyn RngCore) -> Self {
        let layers = topology
            .widths()
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, NetworkError> {
        if layers.is_empty() {
            return Err(NetworkError::TooFewLayers(layers.len() + 1));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            let expected = pair[0].output_width();
            let found = pair[1].input_width();
            if expected != found {
                return Err(NetworkError::WidthMismatch {
                    layer: i + 1,
                    expected,
                    found,
                });
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn topology(&self) -> Topology {
        let mut widths = vec![self.layers[0].input_width()];
        widths.extend(self.layers.iter().map(Layer::output_width));
        Topology(widths)
    }

    pub fn feed_forward(&self, inputs: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .fold(inputs.to_vec(), |activations, layer| layer.propagate(&activations))
    }
}
