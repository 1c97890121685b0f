//! Parameter-of-interest re-parameterization (`spec.md` §3, §4.1 step 1,
//! §9 "Non-negativity via squaring").

use ndarray::{Array1, Array2, ArrayView1};

use crate::workspace::Workspace;

/// Per-process signal strength `r`, and its first/second derivative with
/// respect to the POI each process is scaled by. Background processes
/// carry `r = 1`, `dr = d2r = 0`.
pub struct SignalStrength {
    /// Length `nproc`.
    pub r: Array1<f64>,
    /// `[nproc, npoi]`, mostly zero: `dr[p, k] = d(r_p)/d(x_poi_k)`.
    pub dr: Array2<f64>,
    /// `[nproc, npoi]`, mostly zero: `d2r[p, k] = d^2(r_p)/d(x_poi_k)^2`.
    pub d2r: Array2<f64>,
}

/// Computes `mu = x_poi` (if negative POIs are allowed) or `mu = x_poi^2`
/// otherwise, extended to one entry per process.
pub fn signal_strength(
    workspace: &Workspace,
    x_poi: ArrayView1<f64>,
    allow_negative_poi: bool,
) -> SignalStrength {
    let nproc = workspace.nproc();
    let npoi = workspace.npoi();
    let mut r = Array1::ones(nproc);
    let mut dr = Array2::zeros((nproc, npoi));
    let mut d2r = Array2::zeros((nproc, npoi));

    for (p, proc) in workspace.processes().iter().enumerate() {
        if let Some(k) = proc.poi_index {
            let xk = x_poi[k];
            if allow_negative_poi {
                r[p] = xk;
                dr[[p, k]] = 1.0;
                d2r[[p, k]] = 0.0;
            } else {
                r[p] = xk * xk;
                dr[[p, k]] = 2.0 * xk;
                d2r[[p, k]] = 2.0;
            }
        }
    }

    SignalStrength { r, dr, d2r }
}

/// `x_poi` such that `signal_strength` evaluates to `mu_default` for every
/// signal process (`spec.md` §9: initialize `x_poi = sqrt(mu_default)` to
/// avoid the vanishing gradient at `x = 0` when squaring is active).
pub fn default_x_poi(mu_default: f64, npoi: usize, allow_negative_poi: bool) -> Array1<f64> {
    let x0 = if allow_negative_poi {
        mu_default
    } else {
        mu_default.max(0.0).sqrt()
    };
    Array1::from_elem(npoi, x0)
}
