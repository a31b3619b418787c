use std::io::Cursor;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tract_onnx::prelude::*;

use crate::inference::features::FEATURE_LENGTH;
use crate::inference::output::OutputTensor;

/// A parsed model ready to run forward passes.
pub trait ModelHandle: Send + Sync {
    fn inputs(&self) -> &[String];

    fn outputs(&self) -> &[String];

    /// Feeds `features` into the input called `input_name` and reads back the first declared
    /// output as `f32`, whatever its element type.
    fn run(&self, input_name: &str, features: &[f32]) -> Result<OutputTensor>;
}

/// Turns artifact bytes into a [`ModelHandle`].
pub trait ModelRuntime: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn ModelHandle>>;
}

/// ONNX runtime backed by `tract`, specialised to a single `[1, FEATURE_LENGTH]` f32 input.
#[derive(Debug, Default, Clone, Copy)]
pub struct TractRuntime;

pub struct TractModel {
    plan: TypedRunnableModel<TypedModel>,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl ModelRuntime for TractRuntime {
    #[tracing::instrument(level = "debug", skip_all, fields(size = bytes.len()))]
    fn load(&self, bytes: &[u8]) -> Result<Arc<dyn ModelHandle>> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_LENGTH)),
            )
            .context("Model does not accept a text feature vector")?
            .into_optimized()
            .context("Failed to optimize model")?;

        let inputs = outlet_names(&model, model.input_outlets()?);
        let outputs = outlet_names(&model, model.output_outlets()?);
        if outputs.is_empty() {
            bail!("Model declares no outputs");
        }
        let plan = model.into_runnable().context("Failed to plan model")?;

        Ok(Arc::new(TractModel {
            plan,
            inputs,
            outputs,
        }))
    }
}

fn outlet_names(model: &TypedModel, outlets: &[OutletId]) -> Vec<String> {
    outlets
        .iter()
        .map(|outlet| {
            model
                .outlet_label(*outlet)
                .map(str::to_string)
                .unwrap_or_else(|| model.node(outlet.node).name.clone())
        })
        .collect()
}

impl ModelHandle for TractModel {
    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn run(&self, input_name: &str, features: &[f32]) -> Result<OutputTensor> {
        if self.inputs.first().map(String::as_str) != Some(input_name) {
            bail!("Model has no input named {input_name}");
        }
        if features.len() != FEATURE_LENGTH {
            bail!(
                "Expected {FEATURE_LENGTH} features, got {}",
                features.len()
            );
        }

        let input = tract_ndarray::ArrayD::<f32>::from_shape_vec(
            tract_ndarray::IxDyn(&[1, FEATURE_LENGTH]),
            features.to_vec(),
        )?
        .into_tvalue();
        let outputs = self.plan.run(tvec!(input))?;
        let first = outputs.first().context("Model produced no outputs")?;

        // Remaining outputs (labels, indices) are never read, so their dtype does not matter.
        let values = first
            .cast_to::<f32>()
            .with_context(|| format!("Output {:?} is not numeric", self.outputs.first()))?;
        let view = values.to_array_view::<f32>()?;
        Ok(OutputTensor::new(
            view.iter().copied().collect(),
            view.shape().to_vec(),
        ))
    }
}
