use anyhow::{ensure, Result};
use candle_core::Tensor;

/// Mean over the unmasked positions of `hidden` ([B,T,H]) -> [B,H].
///
/// No normalization is applied; callers match the convention of the index
/// they query.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {:?}", dims);
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let masked = hidden.broadcast_mul(&mask.unsqueeze(2)?)?;
    let sum = masked.sum(1)?;
    // all-padding rows would divide by zero
    let lengths = mask.sum(1)?.unsqueeze(1)?.clamp(1e-9f64, f64::MAX)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    ensure!(mean.dims2()? == (batch, hidden_dim), "pooled shape {:?}", mean.dims());
    Ok(mean)
}
