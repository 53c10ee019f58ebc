//! `sample_select`: draw an integer vector of individuals from a node's
//! selected compartments (§4.3).

use simnet_error::{SimError, SimResult};
use simnet_rng::RngStream;
use simnet_sparse::CscMatrix;

/// Draws `individuals[c] >= 0` for every compartment `c`, nonzero only at
/// the compartments named by column `select` of `e`, summing to the
/// resolved draw count and never exceeding the current count at that
/// compartment.
///
/// `n == 0` means "use `proportion` of the selected total" instead of a
/// literal count; this mirrors the host's event encoding (§3).
pub fn sample_select(
    node: usize,
    u_node: &[i32],
    e: &CscMatrix<i32>,
    select: usize,
    n: i64,
    proportion: f64,
    rng: &mut RngStream,
) -> SimResult<Vec<i64>> {
    let compartments: Vec<usize> = e.col(select).map(|(row, _)| row).collect();
    let k = compartments.len();
    let counts: Vec<i64> = compartments.iter().map(|&c| u_node[c] as i64).collect();
    let total: i64 = counts.iter().sum();

    let n_actual = if n == 0 {
        (proportion * total as f64).round() as i64
    } else {
        n
    };

    if k == 0 || n_actual > total || n_actual < 0 {
        return Err(SimError::SampleSelect {
            node,
            select,
            requested: n_actual,
            available: total,
        });
    }

    let mut individuals = vec![0i64; u_node.len()];

    if n_actual == 0 {
        return Ok(individuals);
    }
    if n_actual == total {
        for (&c, &x) in compartments.iter().zip(counts.iter()) {
            individuals[c] = x;
        }
        return Ok(individuals);
    }
    if k == 1 {
        individuals[compartments[0]] = n_actual;
        return Ok(individuals);
    }
    let nonzero: Vec<usize> = (0..k).filter(|&i| counts[i] > 0).collect();
    if nonzero.len() == 1 {
        individuals[compartments[nonzero[0]]] = n_actual;
        return Ok(individuals);
    }

    if k == 2 {
        let drawn0 = rng.hypergeometric(node, select, counts[0] as u64, counts[1] as u64, n_actual as u64)? as i64;
        individuals[compartments[0]] = drawn0;
        individuals[compartments[1]] = n_actual - drawn0;
        return Ok(individuals);
    }

    // K >= 3: sequential urn draw without replacement.
    let mut remaining = counts.clone();
    let mut x_remaining = total;
    for _ in 0..n_actual {
        let r = rng.uniform_pos() * x_remaining as f64;
        let mut cumulative = 0.0;
        let mut chosen = k - 1;
        for (i, &x) in remaining.iter().enumerate() {
            cumulative += x as f64;
            if r < cumulative {
                chosen = i;
                break;
            }
        }
        remaining[chosen] -= 1;
        individuals[compartments[chosen]] += 1;
        x_remaining -= 1;
    }
    Ok(individuals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simnet_rng::RngFacility;

    fn select_all(nc: usize) -> CscMatrix<i32> {
        let ir: Vec<usize> = (0..nc).collect();
        let jc = vec![0, nc];
        let pr = vec![1i32; nc];
        CscMatrix::new(nc, 1, ir, jc, pr).unwrap()
    }

    #[test]
    fn fast_path_full_draw_returns_all() {
        let e = select_all(2);
        let u = [5i32, 7];
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let out = sample_select(0, &u, &e, 0, 12, 0.0, &mut rng).unwrap();
        assert_eq!(out, vec![5, 7]);
    }

    #[test]
    fn fast_path_single_nonzero_absorbs_all() {
        let e = select_all(2);
        let u = [0i32, 9];
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let out = sample_select(0, &u, &e, 0, 4, 0.0, &mut rng).unwrap();
        assert_eq!(out, vec![0, 4]);
    }

    #[test]
    fn two_compartment_draw_sums_to_n() {
        let e = select_all(2);
        let u = [50i32, 50];
        let mut f = RngFacility::new(7);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let out = sample_select(0, &u, &e, 0, 40, 0.0, &mut rng).unwrap();
        assert_eq!(out[0] + out[1], 40);
        assert!(out[0] <= 50 && out[1] <= 50);
    }

    #[test]
    fn urn_draw_respects_bounds_and_total() {
        let e = select_all(4);
        let u = [3i32, 0, 2, 5];
        let mut f = RngFacility::new(99);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let out = sample_select(0, &u, &e, 0, 7, 0.0, &mut rng).unwrap();
        let total: i64 = out.iter().sum();
        assert_eq!(total, 7);
        for (i, &x) in out.iter().enumerate() {
            assert!(x <= u[i] as i64);
        }
    }

    #[test]
    fn oversized_request_is_sample_select_error() {
        let e = select_all(2);
        let u = [50i32, 0];
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let err = sample_select(0, &u, &e, 0, 100, 0.0, &mut rng).unwrap_err();
        assert!(matches!(err, SimError::SampleSelect { .. }));
    }

    #[test]
    fn proportion_used_when_n_is_zero() {
        let e = select_all(2);
        let u = [20i32, 20];
        let mut f = RngFacility::new(1);
        let mut rng = f.spawn_threads(1).unwrap().remove(0);
        let out = sample_select(0, &u, &e, 0, 0, 0.5, &mut rng).unwrap();
        assert_eq!(out.iter().sum::<i64>(), 20);
    }
}
