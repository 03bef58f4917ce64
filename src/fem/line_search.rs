use crate::base::Config;
use crate::StrError;

/// Implements the secant line search along a fixed direction u
///
/// The merit function is `r(s) = u·R(U + s·u)`, with `r0 = u·R0`.
#[derive(Clone, Copy, Debug)]
pub struct LineSearch {
    /// Accepts s = 1 if |r(1)| ≤ tol·|r0| (zero disables the search)
    pub tol: f64,

    /// Minimum step; the search bottoms out below this value
    pub min: f64,

    /// Maximum number of secant iterations
    pub n_max_iterations: usize,
}

impl LineSearch {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        LineSearch {
            tol: config.ls_tol,
            min: config.ls_min,
            n_max_iterations: config.ls_n_max_iterations,
        }
    }

    /// Finds the step s ∈ {0} ∪ [min, 1]
    ///
    /// # Input
    ///
    /// * `r0` -- the merit function at s = 0
    /// * `eval` -- moves the trial state to U + s·u and returns r(s)
    ///
    /// On return, the trial state corresponds to the returned step (the last call of `eval`).
    /// A zero step means that the search has bottomed out.
    pub fn search<F>(&self, r0: f64, mut eval: F) -> Result<f64, StrError>
    where
        F: FnMut(f64) -> Result<f64, StrError>,
    {
        let mut s = 1.0;
        let mut r1 = eval(s)?;
        if self.tol <= 0.0 || f64::abs(r1) <= self.tol * f64::abs(r0) {
            return Ok(s);
        }
        let (mut s_best, mut r_best) = (s, f64::abs(r1));
        for _ in 0..self.n_max_iterations {
            let mut s_new = s * r0 / (r0 - r1);
            if !s_new.is_finite() {
                s_new = s / 2.0;
            }
            if s_new < self.min {
                if s <= self.min {
                    eval(0.0)?;
                    return Ok(0.0);
                }
                s_new = self.min;
            }
            s = f64::min(s_new, 1.0);
            r1 = eval(s)?;
            if f64::abs(r1) < r_best {
                s_best = s;
                r_best = f64::abs(r1);
            }
            if f64::abs(r1) <= self.tol * f64::abs(r0) {
                break;
            }
        }
        if s != s_best {
            eval(s_best)?;
        }
        Ok(s_best)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::LineSearch;
    use crate::base::Config;

    #[test]
    fn new_works() {
        let ls = LineSearch::new(&Config::new());
        assert_eq!(ls.tol, 0.9);
        assert_eq!(ls.min, 0.01);
        assert_eq!(ls.n_max_iterations, 5);
    }

    #[test]
    fn full_step_is_returned_unchanged() {
        let ls = LineSearch::new(&Config::new());
        let mut calls = Vec::new();
        let s = ls
            .search(1.0, |s| {
                calls.push(s);
                Ok(0.5)
            })
            .unwrap();
        assert_eq!(s, 1.0);
        assert_eq!(calls, &[1.0]);
    }

    #[test]
    fn disabled_search_returns_the_full_step() {
        let mut config = Config::new();
        config.ls_tol = 0.0;
        let ls = LineSearch::new(&config);
        let s = ls.search(1.0, |_| Ok(100.0)).unwrap();
        assert_eq!(s, 1.0);
    }

    #[test]
    fn secant_finds_the_root_of_a_linear_merit() {
        let ls = LineSearch::new(&Config::new());
        let mut last = -1.0;
        let s = ls
            .search(1.0, |s| {
                last = s;
                Ok(1.0 - 2.0 * s)
            })
            .unwrap();
        assert_eq!(s, 0.5);
        assert_eq!(last, 0.5);
    }

    #[test]
    fn search_bottoms_out_with_zero_step() {
        let ls = LineSearch::new(&Config::new());
        let mut calls = Vec::new();
        let s = ls
            .search(1.0, |s| {
                calls.push(s);
                Ok(1.0 + s)
            })
            .unwrap();
        assert_eq!(s, 0.0);
        assert_eq!(calls, &[1.0, 0.01, 0.0]);
    }

    #[test]
    fn best_step_is_kept() {
        let mut config = Config::new();
        config.ls_n_max_iterations = 1;
        let ls = LineSearch::new(&config);
        let mut last = -1.0;
        // r(s) = 1 − 4s + 12s²: r(1) = 9 and the secant gives s = 1/(1−9) < 0; thus s = min
        let s = ls
            .search(1.0, |s| {
                last = s;
                Ok(1.0 - 4.0 * s + 12.0 * s * s)
            })
            .unwrap();
        assert_eq!(s, 0.01);
        assert_eq!(last, 0.01);
    }
}
