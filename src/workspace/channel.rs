use serde::{Deserialize, Serialize};

/// A named axis of a channel's histogram (e.g. `m_t` with 40 bins).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelAxis {
    /// Axis name, used by [`crate::projector::Projector`] axis selection.
    pub name: String,
    /// Bin edges, length `nbins_axis + 1`.
    pub edges: Vec<f64>,
}

impl ChannelAxis {
    /// Number of bins along this axis.
    #[inline]
    pub fn nbins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }
}

/// A named measurement region with an ordered list of bin axes and a
/// contiguous range `[start, stop)` in the global flat bin space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name.
    pub name: String,
    /// Ordered bin axes; the flat range enumerates axes in row-major order.
    pub axes: Vec<ChannelAxis>,
    /// First global bin index belonging to this channel (inclusive).
    pub start: usize,
    /// One past the last global bin index belonging to this channel.
    pub stop: usize,
    /// Optional integrated luminosity, informational only.
    pub lumi: Option<f64>,
    /// Present in the model but excluded from the likelihood.
    pub masked: bool,
}

impl Channel {
    /// Number of global bins covered by this channel.
    #[inline]
    pub fn nbins(&self) -> usize {
        self.stop - self.start
    }

    /// Shape implied by the channel's axes, in row-major order.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(ChannelAxis::nbins).collect()
    }

    /// Index of a named axis within [`Channel::axes`].
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name == name)
    }
}
