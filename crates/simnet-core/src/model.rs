//! The model plug-in contract.
//!
//! A concrete epidemiological model (SIS, SISe3, SEIR, ...) is a value
//! implementing [`TransitionModel`], not a pair of C function pointers:
//! no required global state, `Sync + Send` so the same model instance is
//! shared read-only across worker threads.

use simnet_error::SimResult;

/// Per-call, read-only context passed to every propensity and post-step
/// invocation: the node's reserved sub-domain tag and the shared,
/// read-only global-data block.
#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    /// The node's sub-domain tag, reserved and passed through unconditionally
    /// even though no carried model currently reads it.
    pub sd: i32,
    /// Global data shared read-only across all nodes.
    pub gdata: &'a [f64],
}

/// Supplies the `Nt` transition propensities and the single post-step
/// update for a model. Implementations are plain structs holding the
/// model's parameters; the solver holds one `Arc<dyn TransitionModel>`
/// shared by every worker thread.
pub trait TransitionModel: Sync + Send {
    /// The current rate of `transition` at `node`, given the node's
    /// compartment counts `u`, auxiliary state `v`, and local data `ldata`,
    /// at node-local `time`. Must return a finite, non-negative value.
    fn propensity(
        &self,
        transition: usize,
        u: &[i32],
        v: &[f64],
        ldata: &[f64],
        ctx: ModelContext<'_>,
        time: f64,
    ) -> SimResult<f64>;

    /// Updates `v_new` in place from the node's current `u`, `v`, and
    /// `ldata` at the day boundary `time`. Returns `> 0` to force a full
    /// rate refresh for this node, `0` to refresh only if the node was
    /// otherwise flagged, and `< 0` (the negated value is the model's own
    /// error code) to abort the run.
    fn post_step(
        &self,
        v_new: &mut [f64],
        u: &[i32],
        v: &[f64],
        ldata: &[f64],
        ctx: ModelContext<'_>,
        node: usize,
        time: f64,
    ) -> SimResult<i32>;
}
