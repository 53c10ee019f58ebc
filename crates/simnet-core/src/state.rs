//! The simulation's owned, shared state: compartment counts, auxiliary
//! state, the rate cache, and the per-node bookkeeping the day loop needs.

use crate::dims::Dims;
use simnet_error::{SimError, SimResult};

/// All arrays the day loop reads and writes, owned once by the driver for
/// the lifetime of the run (§3 "Ownership", §5 "Memory model"). Workers
/// borrow disjoint node-indexed slices of these via `chunks_mut`.
pub struct SimulationState {
    dims: Dims,
    /// Compartment counts, `u[node * Nc + c]`.
    pub u: Vec<i32>,
    /// Auxiliary state read during a day's SSA/post-step, `v[node * Nd + d]`.
    pub v: Vec<f64>,
    /// Auxiliary state written by this day's post-step; swapped with `v`
    /// at the end of each day so the next day's SSA reads the update.
    pub v_new: Vec<f64>,
    /// Read-only per-node local data, `ldata[node * Nld + d]`.
    pub ldata: Vec<f64>,
    /// Read-only global data, shared by every node.
    pub gdata: Vec<f64>,
    /// Read-only per-node sub-domain tag.
    pub sd: Vec<i32>,
    /// Node-local simulated time, always in `[tt, next_day)` mid-step.
    pub t_time: Vec<f64>,
    /// Cached transition rates, `t_rate[node * Nt + tr]`.
    pub t_rate: Vec<f64>,
    /// Maintained row sums of `t_rate`, one per node.
    pub sum_t_rate: Vec<f64>,
    /// Set when a node's state changed via a scheduled event and its rates
    /// need a refresh at the next post-step.
    pub update_node: Vec<bool>,
}

impl SimulationState {
    /// Builds the initial state from the host's `u0`/`v0`/`ldata`/`gdata`/`sd`
    /// arrays, validating their lengths against `dims`.
    pub fn new(
        dims: Dims,
        u0: Vec<i32>,
        v0: Vec<f64>,
        ldata: Vec<f64>,
        gdata: Vec<f64>,
        sd: Vec<i32>,
    ) -> SimResult<Self> {
        check_len("u0", u0.len(), dims.u_len())?;
        check_len("v0", v0.len(), dims.v_len())?;
        check_len("ldata", ldata.len(), dims.ldata_len())?;
        check_len("sd", sd.len(), dims.nn)?;

        let v_new = v0.clone();
        Ok(Self {
            t_time: vec![0.0; dims.nn],
            t_rate: vec![0.0; dims.rate_len()],
            sum_t_rate: vec![0.0; dims.nn],
            update_node: vec![false; dims.nn],
            u: u0,
            v: v0,
            v_new,
            ldata,
            gdata,
            sd,
            dims,
        })
    }

    /// The fixed problem dimensions.
    #[must_use]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// The compartment slice for `node`.
    #[must_use]
    pub fn u_node(&self, node: usize) -> &[i32] {
        let nc = self.dims.nc;
        &self.u[node * nc..(node + 1) * nc]
    }

    /// The local-data slice for `node`.
    #[must_use]
    pub fn ldata_node(&self, node: usize) -> &[f64] {
        let nld = self.dims.nld;
        &self.ldata[node * nld..(node + 1) * nld]
    }

    /// The rate-cache slice for `node`.
    #[must_use]
    pub fn t_rate_node(&self, node: usize) -> &[f64] {
        let nt = self.dims.nt;
        &self.t_rate[node * nt..(node + 1) * nt]
    }

    /// Swaps `v` and `v_new`, so the next day's SSA and event appliers read
    /// the auxiliary state this day's post-step just wrote.
    pub fn swap_v(&mut self) {
        std::mem::swap(&mut self.v, &mut self.v_new);
    }
}

fn check_len(name: &'static str, got: usize, want: usize) -> SimResult<()> {
    if got != want {
        return Err(SimError::InvalidConfiguration(format!(
            "{name} has length {got}, expected {want}"
        )));
    }
    Ok(())
}
