//! The solver's validated entry point (§4.11, §6 "Solver entry point
//! inputs"), assembled through a `derive_builder`-generated builder.

use crate::dims::Dims;
use crate::event::RawScheduledEvent;
use crate::model::TransitionModel;
use derive_builder::Builder;
use simnet_error::{SimError, SimResult};
use simnet_sparse::{CscMatrix, CscPattern, ShiftMatrix};
use std::sync::Arc;

/// Where a trajectory (`U` or `V`) should be materialized: a dense buffer
/// the driver allocates from `dims`/`tspan`, or a sparse pattern the
/// caller supplies up front and the driver fills in place.
pub enum OutputSpec {
    /// Dense `ndarray::Array2`, shaped and owned by the driver.
    Dense,
    /// Sparse CSC pattern; `pr` is overwritten column by column.
    Sparse(CscPattern),
}

/// The solver's complete, validated input surface. Build via
/// [`SolverConfigBuilder`]; pass the result to `driver::run`.
#[derive(Builder)]
#[builder(pattern = "owned", build_fn(validate = "SolverConfigBuilder::validate"))]
pub struct SolverConfig {
    /// Problem dimensions.
    pub dims: Dims,
    /// Initial compartment counts, `Nn * Nc` entries.
    pub u0: Vec<i32>,
    /// Initial auxiliary state, `Nn * Nd` entries.
    pub v0: Vec<f64>,
    /// Read-only per-node local data, `Nn * Nld` entries.
    #[builder(default)]
    pub ldata: Vec<f64>,
    /// Read-only global data shared by every node.
    #[builder(default)]
    pub gdata: Vec<f64>,
    /// Per-node sub-domain tag, `Nn` entries.
    pub sd: Vec<i32>,
    /// Non-decreasing report times.
    pub tspan: Vec<f64>,
    /// Transition dependency graph, `Nt x Nt`.
    pub g: CscPattern,
    /// Stoichiometry matrix, `Nc x Nt`.
    pub s: CscMatrix<i32>,
    /// Event selection matrix, `Nc x Nselect`.
    pub e: CscMatrix<i32>,
    /// Compartment shift matrix, `Nc x Nshift`.
    pub shift: ShiftMatrix,
    /// Scheduled events, in host (one-based) index form.
    #[builder(default)]
    pub events: Vec<RawScheduledEvent>,
    /// The model supplying propensities and the post-step update.
    pub model: Arc<dyn TransitionModel>,
    /// Worker thread count; must be at least 1.
    pub nthread: usize,
    /// 64-bit master RNG seed.
    pub seed: u64,
    /// Where to write the compartment trajectory.
    pub u_output: OutputSpec,
    /// Where to write the auxiliary-state trajectory.
    pub v_output: OutputSpec,
}

impl SolverConfigBuilder {
    /// Structural cross-field checks: dimensions agree across `u0`, `v0`,
    /// `sd`, and the sparse matrices, and `tspan` is non-decreasing.
    /// `Nthread < 1` is deliberately *not* checked here — it is checked by
    /// `driver::run` against the built config, so that it surfaces as the
    /// exact `SimError::UnsupportedParallelization` variant §7 calls for
    /// rather than a generic builder string error.
    fn validate(&self) -> Result<(), String> {
        let dims = self.dims.ok_or("dims is required")?;

        if let Some(u0) = &self.u0 {
            if u0.len() != dims.u_len() {
                return Err(format!("u0 has {} entries, expected {}", u0.len(), dims.u_len()));
            }
        }
        if let Some(v0) = &self.v0 {
            if v0.len() != dims.v_len() {
                return Err(format!("v0 has {} entries, expected {}", v0.len(), dims.v_len()));
            }
        }
        if let Some(sd) = &self.sd {
            if sd.len() != dims.nn {
                return Err(format!("sd has {} entries, expected {}", sd.len(), dims.nn));
            }
        }
        if let Some(g) = &self.g {
            if g.nrow() != dims.nt || g.ncol() != dims.nt {
                return Err(format!(
                    "G is {}x{}, expected {0}x{0} = Nt x Nt",
                    g.nrow(),
                    g.ncol()
                ));
            }
        }
        if let Some(s) = &self.s {
            if s.nrow() != dims.nc || s.ncol() != dims.nt {
                return Err(format!(
                    "S is {}x{}, expected {}x{} (Nc x Nt)",
                    s.nrow(),
                    s.ncol(),
                    dims.nc,
                    dims.nt
                ));
            }
        }
        if let Some(e) = &self.e {
            if e.nrow() != dims.nc {
                return Err(format!("E has {} rows, expected Nc = {}", e.nrow(), dims.nc));
            }
        }
        if let Some(shift) = &self.shift {
            if shift.nc() != dims.nc {
                return Err(format!(
                    "shift matrix has {} rows, expected Nc = {}",
                    shift.nc(),
                    dims.nc
                ));
            }
        }
        if let Some(tspan) = &self.tspan {
            if tspan.windows(2).any(|w| w[0] > w[1]) {
                return Err("tspan is not non-decreasing".to_string());
            }
        }
        Ok(())
    }
}

impl SolverConfig {
    /// The `Nthread < 1` check §7 requires to surface as a precise
    /// `SimError`, separated from the builder's structural validation.
    pub fn check_parallelism(&self) -> SimResult<()> {
        if self.nthread < 1 {
            return Err(SimError::UnsupportedParallelization {
                nthread: self.nthread,
            });
        }
        Ok(())
    }
}

impl From<SolverConfigBuilderError> for SimError {
    fn from(e: SolverConfigBuilderError) -> Self {
        SimError::InvalidConfiguration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelContext;
    use simnet_sparse::{CscMatrix, CscPattern, ShiftMatrix};

    struct NullModel;
    impl TransitionModel for NullModel {
        fn propensity(
            &self,
            _t: usize,
            _u: &[i32],
            _v: &[f64],
            _l: &[f64],
            _ctx: ModelContext<'_>,
            _time: f64,
        ) -> SimResult<f64> {
            Ok(0.0)
        }
        fn post_step(
            &self,
            _v_new: &mut [f64],
            _u: &[i32],
            _v: &[f64],
            _l: &[f64],
            _ctx: ModelContext<'_>,
            _node: usize,
            _time: f64,
        ) -> SimResult<i32> {
            Ok(0)
        }
    }

    fn base_builder() -> SolverConfigBuilder {
        let dims = Dims {
            nn: 1,
            nc: 2,
            nd: 0,
            nld: 0,
            nt: 1,
        };
        SolverConfigBuilder::default()
            .dims(dims)
            .u0(vec![1, 1])
            .v0(vec![])
            .sd(vec![0])
            .tspan(vec![0.0, 1.0])
            .g(CscPattern::new(1, 1, vec![0], vec![0, 1]).unwrap())
            .s(CscMatrix::new(2, 1, vec![0, 1], vec![0, 2], vec![-1, 1]).unwrap())
            .e(CscMatrix::new(2, 1, vec![0, 1], vec![0, 2], vec![1, 1]).unwrap())
            .shift(ShiftMatrix::new(2, 1, vec![0, 0]).unwrap())
            .model(Arc::new(NullModel) as Arc<dyn TransitionModel>)
            .nthread(1)
            .seed(0)
            .u_output(OutputSpec::Dense)
            .v_output(OutputSpec::Dense)
    }

    #[test]
    fn builds_with_consistent_dimensions() {
        assert!(base_builder().build().is_ok());
    }

    #[test]
    fn rejects_mismatched_u0() {
        let err = base_builder().u0(vec![1]).build().unwrap_err();
        assert!(err.to_string().contains("u0"));
    }

    #[test]
    fn rejects_non_monotonic_tspan() {
        let err = base_builder().tspan(vec![1.0, 0.0]).build().unwrap_err();
        assert!(err.to_string().contains("tspan"));
    }

    #[test]
    fn check_parallelism_rejects_zero_threads() {
        let config = base_builder().nthread(0).build().unwrap();
        let err = config.check_parallelism().unwrap_err();
        assert!(matches!(err, SimError::UnsupportedParallelization { nthread: 0 }));
    }
}
