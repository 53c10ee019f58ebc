//! The top-level driver: day-loop state machine coordinating the parallel
//! and serial phases (§4.9).

use crate::apply::{apply_e1, apply_e2};
use crate::config::{OutputSpec, SolverConfig};
use crate::event::EventQueues;
use crate::model::ModelContext;
use crate::output::{crossed_tspan_indices, Output};
use crate::partition::{split_by_thread, thread_range};
use crate::poststep::run_post_step;
use crate::ssa::step_node;
use crate::state::SimulationState;
use ndarray::Array2;
use simnet_error::{SimError, SimResult};
use simnet_rng::{RngFacility, RngStream};
use simnet_sparse::CscMatrix;
use std::sync::Mutex;

/// The two trajectories a run produces.
pub struct SolverOutputs {
    /// Compartment-count trajectory.
    pub u: Output<i32>,
    /// Auxiliary-state trajectory.
    pub v: Output<f64>,
}

/// Runs the solver to completion: `INIT -> SPLIT_EVENTS -> DAY_LOOP ->
/// DONE`, with the first error from any phase aborting the run before the
/// next phase starts.
pub fn run(config: &SolverConfig) -> SimResult<SolverOutputs> {
    config.check_parallelism()?;
    let dims = config.dims;
    let tlen = config.tspan.len();

    log::info!(
        "simnet: starting run (Nn={}, Nc={}, Nt={}, Nthread={}, tlen={})",
        dims.nn,
        dims.nc,
        dims.nt,
        config.nthread,
        tlen
    );

    let mut state = SimulationState::new(
        dims,
        config.u0.clone(),
        config.v0.clone(),
        config.ldata.clone(),
        config.gdata.clone(),
        config.sd.clone(),
    )?;

    let t0 = config.tspan.first().copied().unwrap_or(0.0);
    init_rate_cache(&mut state, config.model.as_ref(), t0)?;

    let mut queues = EventQueues::partition(&config.events, dims.nn, config.nthread)?;
    log::debug!(
        "simnet: partitioned {} scheduled events ({} E2, rest E1)",
        config.events.len(),
        queues.e2.len()
    );

    let mut facility = RngFacility::new(config.seed);
    let mut rngs = facility.spawn_threads(config.nthread)?;

    let mut u_output = make_output(&config.u_output, dims.u_len(), tlen, 0i32);
    let mut v_output = make_output(&config.v_output, dims.v_len(), tlen, 0.0f64);
    write_full_column(&mut u_output, 0, &state.u);
    write_full_column(&mut v_output, 0, &state.v);
    let mut next_it = 1usize;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.nthread)
        .build()
        .map_err(|_| SimError::UnsupportedParallelization {
            nthread: config.nthread,
        })?;

    let mut tt = t0;
    let mut next_day = tt.floor() + 1.0;

    while next_it < tlen {
        pool.install(|| ssa_and_e1_phase(&mut state, &mut queues, &mut rngs, config, tt, next_day))?;

        apply_e2(
            &mut state.u,
            dims.nc,
            &mut state.update_node,
            &mut queues.e2,
            tt,
            &config.e,
            &config.shift,
            &mut rngs[0],
        )?;

        pool.install(|| post_step_phase(&mut state, config, tt))?;

        tt = next_day;
        next_day += 1.0;

        let crossed = crossed_tspan_indices(&config.tspan, tt, &mut next_it);
        for col in crossed {
            write_full_column(&mut u_output, col, &state.u);
            write_full_column(&mut v_output, col, &state.v_new);
        }

        state.swap_v();
    }

    log::info!("simnet: run complete");
    Ok(SolverOutputs {
        u: u_output,
        v: v_output,
    })
}

fn init_rate_cache(
    state: &mut SimulationState,
    model: &dyn crate::model::TransitionModel,
    t0: f64,
) -> SimResult<()> {
    let dims = state.dims();
    for node in 0..dims.nn {
        let ctx = ModelContext {
            sd: state.sd[node],
            gdata: &state.gdata,
        };
        let u_node = state.u_node(node).to_vec();
        let v_node = state.v[node * dims.nd..(node + 1) * dims.nd].to_vec();
        let ldata_node = state.ldata_node(node).to_vec();
        let mut sum = 0.0;
        for tr in 0..dims.nt {
            let rate = model.propensity(tr, &u_node, &v_node, &ldata_node, ctx, t0)?;
            if !rate.is_finite() || rate < 0.0 {
                return Err(SimError::InvalidRate {
                    node,
                    transition: tr,
                    rate,
                });
            }
            state.t_rate[node * dims.nt + tr] = rate;
            sum += rate;
        }
        state.sum_t_rate[node] = sum;
    }
    Ok(())
}

fn ssa_and_e1_phase(
    state: &mut SimulationState,
    queues: &mut EventQueues,
    rngs: &mut [RngStream],
    config: &SolverConfig,
    tt: f64,
    next_day: f64,
) -> SimResult<()> {
    let dims = config.dims;
    let nthread = config.nthread;
    let errors: Vec<Mutex<Option<SimError>>> = (0..nthread).map(|_| Mutex::new(None)).collect();

    let u_chunks = split_by_thread(&mut state.u, dims.nn, nthread, dims.nc);
    let t_rate_chunks = split_by_thread(&mut state.t_rate, dims.nn, nthread, dims.nt);
    let t_time_chunks = split_by_thread(&mut state.t_time, dims.nn, nthread, 1);
    let sum_chunks = split_by_thread(&mut state.sum_t_rate, dims.nn, nthread, 1);
    let update_chunks = split_by_thread(&mut state.update_node, dims.nn, nthread, 1);

    let v = &state.v;
    let ldata = &state.ldata;
    let sd = &state.sd;
    let gdata = &state.gdata;
    let s = &config.s;
    let g = &config.g;
    let e = &config.e;
    let shift = &config.shift;
    let model = config.model.as_ref();

    rayon::scope(|scope| {
        let mut rng_iter = rngs.iter_mut();
        let mut queue_iter = queues.e1.iter_mut();
        let mut u_iter = u_chunks.into_iter();
        let mut rate_iter = t_rate_chunks.into_iter();
        let mut time_iter = t_time_chunks.into_iter();
        let mut sum_iter = sum_chunks.into_iter();
        let mut upd_iter = update_chunks.into_iter();

        for thread in 0..nthread {
            let range = thread_range(thread, dims.nn, nthread);
            let node_offset = range.start;
            let u_chunk = u_iter.next().expect("one chunk per thread");
            let rate_chunk = rate_iter.next().expect("one chunk per thread");
            let time_chunk = time_iter.next().expect("one chunk per thread");
            let sum_chunk = sum_iter.next().expect("one chunk per thread");
            let upd_chunk = upd_iter.next().expect("one chunk per thread");
            let rng = rng_iter.next().expect("one rng per thread");
            let queue = queue_iter.next().expect("one queue per thread");
            let error_slot = &errors[thread];

            scope.spawn(move |_| {
                let result = (|| -> SimResult<()> {
                    for local in 0..range.len() {
                        let node = node_offset + local;
                        let u_node = &mut u_chunk[local * dims.nc..(local + 1) * dims.nc];
                        let rate_node = &mut rate_chunk[local * dims.nt..(local + 1) * dims.nt];
                        let v_node = &v[node * dims.nd..(node + 1) * dims.nd];
                        let ldata_node = &ldata[node * dims.nld..(node + 1) * dims.nld];
                        let ctx = ModelContext {
                            sd: sd[node],
                            gdata,
                        };
                        step_node(
                            node,
                            u_node,
                            rate_node,
                            &mut sum_chunk[local],
                            &mut time_chunk[local],
                            v_node,
                            ldata_node,
                            ctx,
                            next_day,
                            s,
                            g,
                            model,
                            rng,
                        )?;
                    }
                    apply_e1(
                        u_chunk,
                        node_offset,
                        dims.nc,
                        upd_chunk,
                        queue,
                        tt,
                        e,
                        shift,
                        rng,
                    )
                })();
                if let Err(err) = result {
                    *error_slot.lock().unwrap() = Some(err);
                }
            });
        }
    });

    first_error(&errors)
}

fn post_step_phase(state: &mut SimulationState, config: &SolverConfig, tt: f64) -> SimResult<()> {
    let dims = config.dims;
    let nthread = config.nthread;
    let errors: Vec<Mutex<Option<SimError>>> = (0..nthread).map(|_| Mutex::new(None)).collect();

    let u_chunks = split_by_thread(&mut state.u, dims.nn, nthread, dims.nc);
    let v_new_chunks = split_by_thread(&mut state.v_new, dims.nn, nthread, dims.nd);
    let t_rate_chunks = split_by_thread(&mut state.t_rate, dims.nn, nthread, dims.nt);
    let sum_chunks = split_by_thread(&mut state.sum_t_rate, dims.nn, nthread, 1);
    let update_chunks = split_by_thread(&mut state.update_node, dims.nn, nthread, 1);

    let v = &state.v;
    let ldata = &state.ldata;
    let sd = &state.sd;
    let gdata = &state.gdata;
    let model = config.model.as_ref();

    rayon::scope(|scope| {
        let mut u_iter = u_chunks.into_iter();
        let mut vnew_iter = v_new_chunks.into_iter();
        let mut rate_iter = t_rate_chunks.into_iter();
        let mut sum_iter = sum_chunks.into_iter();
        let mut upd_iter = update_chunks.into_iter();

        for thread in 0..nthread {
            let range = thread_range(thread, dims.nn, nthread);
            let node_offset = range.start;
            let u_chunk = u_iter.next().expect("one chunk per thread");
            let vnew_chunk = vnew_iter.next().expect("one chunk per thread");
            let rate_chunk = rate_iter.next().expect("one chunk per thread");
            let sum_chunk = sum_iter.next().expect("one chunk per thread");
            let upd_chunk = upd_iter.next().expect("one chunk per thread");
            let error_slot = &errors[thread];

            scope.spawn(move |_| {
                let result = (|| -> SimResult<()> {
                    for local in 0..range.len() {
                        let node = node_offset + local;
                        let u_node = &u_chunk[local * dims.nc..(local + 1) * dims.nc];
                        let vnew_node = &mut vnew_chunk[local * dims.nd..(local + 1) * dims.nd];
                        let v_node = &v[node * dims.nd..(node + 1) * dims.nd];
                        let ldata_node = &ldata[node * dims.nld..(node + 1) * dims.nld];
                        let rate_node = &mut rate_chunk[local * dims.nt..(local + 1) * dims.nt];
                        let ctx = ModelContext {
                            sd: sd[node],
                            gdata,
                        };
                        run_post_step(
                            node,
                            u_node,
                            v_node,
                            vnew_node,
                            ldata_node,
                            ctx,
                            tt,
                            rate_node,
                            &mut sum_chunk[local],
                            &mut upd_chunk[local],
                            model,
                        )?;
                    }
                    Ok(())
                })();
                if let Err(err) = result {
                    *error_slot.lock().unwrap() = Some(err);
                }
            });
        }
    });

    first_error(&errors)
}

fn first_error(errors: &[Mutex<Option<SimError>>]) -> SimResult<()> {
    for slot in errors {
        if let Some(err) = slot.lock().unwrap().take() {
            return Err(err);
        }
    }
    Ok(())
}

fn make_output<T: Copy>(spec: &OutputSpec, rows: usize, tlen: usize, zero: T) -> Output<T> {
    match spec {
        OutputSpec::Dense => Output::Dense(Array2::from_elem((rows, tlen), zero)),
        OutputSpec::Sparse(pattern) => {
            Output::Sparse(CscMatrix::from_pattern(pattern.clone(), zero))
        }
    }
}

fn write_full_column<T: Copy>(output: &mut Output<T>, col: usize, full_state: &[T]) {
    if output.is_sparse() {
        output.write_sparse_column(col, full_state);
    } else {
        output.write_dense_rows(col, 0, full_state);
    }
}
