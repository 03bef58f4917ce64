use crate::FnTime;

/// Defines the smallest allowed dt_min (Control)
pub const CONTROL_MIN_DT_MIN: f64 = 1e-10;

/// Holds the (time-loop) options to control the simulation
#[derive(Clone, Debug)]
pub struct Control {
    /// Initial time
    pub t_ini: f64,

    /// Final time
    pub t_fin: f64,

    /// Time increments
    pub dt: FnTime,

    /// Minimum allowed time increment min(Δt)
    ///
    /// A cutback that would go below this value aborts the simulation.
    pub dt_min: f64,

    /// Maximum number of time steps
    pub n_max_time_steps: usize,

    /// Maximum number of retries (with a reduced Δt) of a failed time step
    pub n_max_retries: usize,

    /// Factor multiplying Δt after a failed time step; 0 < dt_cutback < 1
    pub dt_cutback: f64,

    /// Verbose mode during timesteps
    pub verbose_timesteps: bool,

    /// Verbose mode during iterations
    pub verbose_iterations: bool,
}

impl Control {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        Control {
            t_ini: 0.0,
            t_fin: 1.0,
            dt: |_| 0.1,
            dt_min: CONTROL_MIN_DT_MIN,
            n_max_time_steps: 1_000,
            n_max_retries: 5,
            dt_cutback: 0.5,
            verbose_timesteps: false,
            verbose_iterations: false,
        }
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        if self.t_ini < 0.0 {
            return Some(format!("t_ini = {:?} is incorrect; it must be ≥ 0.0", self.t_ini));
        }
        if self.t_fin < self.t_ini {
            return Some(format!(
                "t_fin = {:?} is incorrect; it must be > t_ini = {:?}",
                self.t_fin, self.t_ini
            ));
        }
        if self.dt_min < CONTROL_MIN_DT_MIN {
            return Some(format!(
                "dt_min = {:?} is incorrect; it must be ≥ {:e}",
                self.dt_min, CONTROL_MIN_DT_MIN
            ));
        }
        if self.dt_cutback <= 0.0 || self.dt_cutback >= 1.0 {
            return Some(format!(
                "dt_cutback = {:?} is incorrect; it must be 0.0 < dt_cutback < 1.0",
                self.dt_cutback
            ));
        }
        None // all good
    }

    /// Prints the header of the table with timestep and iteration data
    #[inline]
    pub fn print_header(&self) {
        if self.verbose_timesteps || self.verbose_iterations {
            log::info!("Legend:");
            log::info!("✅ : converged");
            log::info!("👍 : converging");
            log::info!("🥵 : diverging");
            log::info!("😱 : found NaN or Inf");
            log::info!("🔄 : stiffness reformation");
            log::info!(
                "{:>8} {:>13} {:>13} {:>5} {:>9}   {:>9}   {:>9}   {:>9}  ",
                "timestep",
                "t",
                "Δt",
                "iter",
                "|R|²",
                "tol²·|R₀|²",
                "|u·R|",
                "tol·|u·R|₀"
            );
        }
    }

    /// Prints timestep data
    #[inline]
    #[rustfmt::skip]
    pub fn print_timestep(&self, timestep: usize, t: f64, dt: f64) {
        if !self.verbose_timesteps {
            return ;
        }
        log::info!(
            "{:>8} {:>13.6e} {:>13.6e} {:>5} {:>9}   {:>9}   {:>9}   {:>9}  ",
            timestep+1, t, dt, ".", ".", ".", ".", "."
        );
    }

    /// Prints iteration data
    ///
    /// The norms are squared (residual) or linear (energy), as used by the convergence check.
    #[inline]
    #[rustfmt::skip]
    pub fn print_iteration(&self, it: usize, norm_rr: f64, ref_rr: f64, norm_ee: f64, ref_ee: f64, diverging: bool, reformed: bool) {
        // skip if not verbose
        if !self.verbose_iterations {
            return;
        }
        let l = if !norm_rr.is_finite() {
            "😱" // found NaN or Inf
        } else if norm_rr <= ref_rr && norm_ee <= ref_ee {
            "✅" // converged
        } else if diverging {
            "🥵" // energy above its running maximum
        } else {
            "👍" // converging
        };
        let r = if reformed { "🔄" } else { "  " };
        log::info!(
            "{:>8} {:>13} {:>13} {:>5} {:>9.2e}{} {:>9.2e}   {:>9.2e}   {:>9.2e}{}",
            ".",
            ".",
            ".",
            it + 1,
            norm_rr,
            l,
            ref_rr,
            norm_ee,
            ref_ee,
            r,
        );
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Control, CONTROL_MIN_DT_MIN};

    #[test]
    fn new_works() {
        let control = Control::new();
        assert_eq!(control.t_ini, 0.0);
        assert_eq!(control.t_fin, 1.0);
        assert_eq!((control.dt)(123.0), 0.1);
        assert_eq!(control.dt_min, CONTROL_MIN_DT_MIN);
        assert_eq!(control.n_max_retries, 5);
        assert_eq!(control.dt_cutback, 0.5);
        assert_eq!(control.verbose_timesteps, false);
        assert_eq!(control.verbose_iterations, false);
    }

    #[test]
    fn validate_works() {
        let mut control = Control::new();
        control.t_ini = -1.0;
        assert_eq!(
            control.validate(),
            Some("t_ini = -1.0 is incorrect; it must be ≥ 0.0".to_string())
        );
        control.t_ini = 2.0;
        assert_eq!(
            control.validate(),
            Some("t_fin = 1.0 is incorrect; it must be > t_ini = 2.0".to_string())
        );
        control.t_ini = 0.0;
        control.dt_min = 0.0;
        assert_eq!(
            control.validate(),
            Some("dt_min = 0.0 is incorrect; it must be ≥ 1e-10".to_string())
        );
        control.dt_min = 1e-8;
        control.dt_cutback = 1.0;
        assert_eq!(
            control.validate(),
            Some("dt_cutback = 1.0 is incorrect; it must be 0.0 < dt_cutback < 1.0".to_string())
        );
        control.dt_cutback = 0.25;
        assert_eq!(control.validate(), None);
    }

    #[test]
    fn print_functions_run() {
        let mut control = Control::new();
        control.verbose_timesteps = true;
        control.verbose_iterations = true;
        control.print_header();
        control.print_timestep(0, 0.1, 0.1);
        control.print_iteration(0, 1.0, 1e-6, 1.0, 0.01, false, true);
        control.print_iteration(1, f64::NAN, 1e-6, 1.0, 0.01, true, false);
    }
}
