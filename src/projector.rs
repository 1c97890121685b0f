//! Channel-axis selection, reduction and transposition for reported
//! observables (`spec.md` §4.6 "Projections (PR)").
//!
//! A [`Projector`] reshapes a channel's flat bin slice to its declared
//! axis shape, optionally applies the exponential transform, sums over
//! axes the caller did not ask for, and permutes the remainder into the
//! caller's requested order.

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::error::{FitError, Result};
use crate::workspace::{Channel, Workspace};

/// A channel name plus an ordered subset of that channel's axes to keep.
pub struct Projector<'a> {
    channel: &'a str,
    keep_axes: Vec<&'a str>,
}

impl<'a> Projector<'a> {
    /// `keep_axes` is the caller's requested output order; axes of
    /// `channel` not named here are summed away.
    pub fn new(channel: &'a str, keep_axes: Vec<&'a str>) -> Self {
        Self { channel, keep_axes }
    }

    fn resolve(&self, workspace: &Workspace) -> Result<(&Channel, Vec<usize>)> {
        let channel = workspace
            .channels()
            .iter()
            .find(|c| c.name == self.channel)
            .ok_or_else(|| FitError::ProjectionError {
                channel: self.channel.to_string(),
                axis: String::new(),
            })?;

        let keep_indices = self
            .keep_axes
            .iter()
            .map(|&name| {
                channel
                    .axes
                    .iter()
                    .position(|a| a.name == name)
                    .ok_or_else(|| FitError::ProjectionError {
                        channel: self.channel.to_string(),
                        axis: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((channel, keep_indices))
    }

    /// Projects a flat global-bin slice (the caller passes the whole
    /// vector; only `channel`'s `[start, stop)` range is used) down to
    /// the requested axis subset, summing over the rest and permuting
    /// into the caller's order. `transform` is applied per-bin before
    /// reduction, matching the exponential-space transform semantics of
    /// the expectation engine.
    pub fn project(
        &self,
        workspace: &Workspace,
        values: &[f64],
        transform: impl Fn(f64) -> f64,
    ) -> Result<ArrayD<f64>> {
        let (channel, keep_indices) = self.resolve(workspace)?;
        let shape: Vec<usize> = channel.axes.iter().map(|a| a.nbins()).collect();
        let slice = &values[channel.start..channel.stop];

        let transformed: Vec<f64> = slice.iter().copied().map(transform).collect();
        let tensor = ArrayD::from_shape_vec(IxDyn(&shape), transformed)
            .expect("channel axis shapes partition its flat bin range by construction");

        Ok(reduce_and_permute(tensor.view(), &keep_indices))
    }
}

/// Sums `tensor` over every axis not in `keep_indices`, then permutes the
/// surviving axes into `keep_indices`'s order.
fn reduce_and_permute(tensor: ArrayViewD<f64>, keep_indices: &[usize]) -> ArrayD<f64> {
    let ndim = tensor.ndim();
    let reduced_axes: Vec<usize> = (0..ndim).filter(|a| !keep_indices.contains(a)).collect();

    // Sum away unwanted axes, keeping them as length-1 placeholders so
    // every other axis index stays valid throughout the loop.
    let mut reduced = tensor.to_owned();
    for &axis in &reduced_axes {
        reduced = reduced
            .sum_axis(ndarray::Axis(axis))
            .insert_axis(ndarray::Axis(axis));
    }

    // Permute so `keep_indices` (in the caller's order) come first,
    // followed by the now-length-1 reduced axes.
    let order: Vec<usize> = keep_indices
        .iter()
        .copied()
        .chain(reduced_axes.iter().copied())
        .collect();
    let permuted = reduced.permuted_axes(order);

    // Drop the trailing length-1 axes.
    let mut out = permuted;
    for _ in 0..reduced_axes.len() {
        out = out.index_axis_move(ndarray::Axis(keep_indices.len()), 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    #[test]
    fn sums_unwanted_axis_and_permutes_kept_ones() {
        // shape [2, 3]; keep axis 1 only, reduced over axis 0.
        let t = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let out = reduce_and_permute(t.view(), &[1]);
        assert_eq!(out.shape(), &[3]);
        assert_eq!(out, array![5.0, 7.0, 9.0].into_dyn());
    }

    #[test]
    fn reverses_axis_order_when_requested() {
        // shape [2, 3], keep both axes but in reverse order.
        let t = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let out = reduce_and_permute(t.view(), &[1, 0]);
        assert_eq!(out.shape(), &[3, 2]);
        assert_eq!(out.index_axis(Axis(0), 0), array![1.0, 4.0].into_dyn());
    }
}
