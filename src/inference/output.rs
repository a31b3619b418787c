use serde::Serialize;
use serde_json::Value;

/// Heads with more columns than this are returned as raw tensors.
pub const MAX_CLASSES: usize = 10;

/// A dense `f32` tensor read back from a model, in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl OutputTensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Prediction {
    Classification {
        predicted_class: usize,
        sentiment: String,
        confidence: f32,
        probabilities: Vec<f32>,
        shape: Vec<usize>,
    },
    Raw {
        prediction: Value,
        shape: Vec<usize>,
    },
}

impl Prediction {
    /// Chooses between a small classification head and a raw tensor from the declared shape.
    pub fn from_output(output: OutputTensor) -> Self {
        let head = match output.shape.as_slice() {
            [rows, classes] if *rows > 0 && (1..=MAX_CLASSES).contains(classes) => {
                output.data.get(..*classes)
            }
            _ => None,
        };
        let Some((probabilities, (predicted_class, confidence))) =
            head.and_then(|row| argmax(row).map(|best| (row.to_vec(), best)))
        else {
            return Prediction::raw(output);
        };

        Prediction::Classification {
            predicted_class,
            sentiment: class_label(predicted_class),
            confidence,
            probabilities,
            shape: output.shape,
        }
    }

    fn raw(output: OutputTensor) -> Self {
        Prediction::Raw {
            prediction: nest(&output.data, &output.shape),
            shape: output.shape,
        }
    }
}

pub fn class_label(class: usize) -> String {
    match class {
        0 => "negative".to_string(),
        1 => "positive".to_string(),
        n => format!("class_{n}"),
    }
}

/// Index and value of the first maximum.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, max)) if v <= max => best,
            _ => Some((i, v)),
        })
}

fn nest(data: &[f32], shape: &[usize]) -> Value {
    match shape.split_first() {
        None => data.first().map_or(Value::Null, |v| Value::from(*v)),
        Some((&len, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array(
                (0..len)
                    .map(|i| nest(data.get(i * stride..(i + 1) * stride).unwrap_or(&[]), rest))
                    .collect(),
            )
        }
    }
}
