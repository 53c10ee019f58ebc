//! Problem dimensions shared across the solver.

/// The fixed sizes that define a run: node count, compartment count,
/// auxiliary-state count, local-data count, and transition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    /// Number of nodes, `Nn`.
    pub nn: usize,
    /// Number of compartments per node, `Nc`.
    pub nc: usize,
    /// Number of auxiliary (continuous) state entries per node, `Nd`.
    pub nd: usize,
    /// Number of read-only local-data entries per node, `Nld`.
    pub nld: usize,
    /// Number of transitions per node, `Nt`.
    pub nt: usize,
}

impl Dims {
    /// Total number of compartment entries across all nodes (`Nn * Nc`).
    #[must_use]
    pub fn u_len(&self) -> usize {
        self.nn * self.nc
    }

    /// Total number of auxiliary-state entries across all nodes (`Nn * Nd`).
    #[must_use]
    pub fn v_len(&self) -> usize {
        self.nn * self.nd
    }

    /// Total number of local-data entries across all nodes (`Nn * Nld`).
    #[must_use]
    pub fn ldata_len(&self) -> usize {
        self.nn * self.nld
    }

    /// Total number of rate-cache entries across all nodes (`Nn * Nt`).
    #[must_use]
    pub fn rate_len(&self) -> usize {
        self.nn * self.nt
    }
}
