use std::path::Path;

use anyhow::Context;
use tract_onnx::prelude::*;

pub(crate) type Plan = TypedRunnableModel<TypedModel>;

/// Load an ONNX model with a fixed `[1, 3, size, size]` f32 input.
pub(crate) fn load_square_model(path: &Path, size: u32) -> anyhow::Result<Plan> {
    let plan = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to load ONNX model from {}", path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size as usize, size as usize)),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")?;
    Ok(plan)
}
