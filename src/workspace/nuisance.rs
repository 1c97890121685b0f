use serde::{Deserialize, Serialize};

/// Whether a nuisance's multiplicative response is a symmetric log-normal
/// or an asymmetric (two-sided, interpolated) log-normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Single log-response, shared by the `up` and `down` variation.
    Symmetric,
    /// Two half-responses, interpolated by [`crate::expectation::interpolation`].
    Asymmetric,
}

/// A named parameter with a Gaussian constraint, group membership, and
/// an optional "nuisance of interest" flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nuisance {
    /// Nuisance name.
    pub name: String,
    /// Gaussian constraint weight `w >= 0`; `0` means unconstrained.
    pub constraint_weight: f64,
    /// Group this nuisance belongs to, if any. A nuisance index appears in
    /// at most one group.
    pub group: Option<usize>,
    /// Reported alongside the POIs in impact/pull tables.
    pub noi: bool,
    /// Symmetric or asymmetric log-normal response.
    pub response: ResponseKind,
}

impl Nuisance {
    /// `true` when `constraint_weight == 0`, i.e. no constraint term and
    /// no prefit variance contribution from the constraint.
    #[inline]
    pub fn is_unconstrained(&self) -> bool {
        self.constraint_weight == 0.0
    }
}

/// Ragged partition of nuisance indices into named groups, stored as a
/// flat index array plus offsets (`spec.md` §9 "Group index ragged arrays")
/// rather than a `Vec<Vec<usize>>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Groups {
    /// Group names, in the order impacts are reported.
    pub names: Vec<String>,
    /// Concatenated nuisance indices for every group.
    flat_indices: Vec<usize>,
    /// `offsets[g]..offsets[g + 1]` slices `flat_indices` for group `g`.
    offsets: Vec<usize>,
}

impl Groups {
    /// Builds the ragged partition from an explicit `(name, members)` list.
    pub fn from_members(groups: Vec<(String, Vec<usize>)>) -> Self {
        let mut names = Vec::with_capacity(groups.len());
        let mut flat_indices = Vec::new();
        let mut offsets = vec![0usize];
        for (name, members) in groups {
            names.push(name);
            flat_indices.extend(members);
            offsets.push(flat_indices.len());
        }
        Self {
            names,
            flat_indices,
            offsets,
        }
    }

    /// Number of groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` if there are no groups.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Nuisance indices belonging to group `g`.
    pub fn members(&self, g: usize) -> &[usize] {
        &self.flat_indices[self.offsets[g]..self.offsets[g + 1]]
    }

    /// Iterates over `(name, members)` pairs in group order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        (0..self.len()).map(|g| (self.names[g].as_str(), self.members(g)))
    }
}
