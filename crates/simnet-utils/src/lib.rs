// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// simnet: a parallel stochastic simulator for networked CTMC population models.
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Statistics and assertion helpers shared by the integration test suites.

/// Sample moments over a slice of draws, used to check Monte Carlo output
/// against a reference distribution's theoretical moments.
pub trait Statistics {
    /// Arithmetic mean.
    fn mean(&self) -> f64;
    /// Sample variance (denominator `n - 1`).
    fn variance(&self) -> f64;
}

impl Statistics for [f64] {
    fn mean(&self) -> f64 {
        assert!(!self.is_empty());
        self.iter().sum::<f64>() / self.len() as f64
    }

    fn variance(&self) -> f64 {
        assert!(self.len() > 1);
        let m = self.mean();
        self.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (self.len() - 1) as f64
    }
}

impl Statistics for [u64] {
    fn mean(&self) -> f64 {
        assert!(!self.is_empty());
        self.iter().map(|&x| x as f64).sum::<f64>() / self.len() as f64
    }

    fn variance(&self) -> f64 {
        assert!(self.len() > 1);
        let m = self.mean();
        self.iter()
            .map(|&x| (x as f64 - m).powi(2))
            .sum::<f64>()
            / (self.len() - 1) as f64
    }
}

/// Asserts two floating point values are equal within an absolute
/// tolerance, printing both values and their difference on failure.
#[macro_export]
macro_rules! assert_approx_equal {
    ($x:expr, $y:expr, $tol:expr) => {{
        let diff = ($x - $y).abs();
        assert!(
            diff <= $tol,
            "assertion failed: |{} - {}| = {} exceeds tolerance {}",
            $x,
            $y,
            diff,
            $tol
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance_of_known_series() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx_equal!(xs.mean(), 5.0, 1e-9);
        assert_approx_equal!(xs.variance(), 4.571_428_571_428_571, 1e-9);
    }

    #[test]
    fn approx_equal_within_tolerance() {
        assert_approx_equal!(1.0000001_f64, 1.0_f64, 1e-6);
    }

    #[test]
    #[should_panic]
    fn approx_equal_outside_tolerance_panics() {
        assert_approx_equal!(1.1_f64, 1.0_f64, 1e-6);
    }
}
