use super::Equations;
use crate::base::{Config, Dof};
use crate::StrError;
use gemlab::mesh::PointId;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the state of a simulation, including primary and rate variables
///
/// The vectors have length equal to the total number of equations (nodal plus Lagrange
/// multipliers). Fixed DOFs have no entry and are always zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FemState {
    /// Time
    pub t: f64,

    /// Delta time
    pub dt: f64,

    /// Primary unknowns {U} at the current (trial) configuration
    pub uu: Vector,

    /// First time derivative of primary unknowns {V}
    pub vv: Vector,

    /// Converged primary unknowns at the previous time (U_t)
    pub uu_old: Vector,

    /// Converged rates at the previous time (V_t)
    pub vv_old: Vector,

    /// Holds ∂V/∂U = 1/(γ Δt) during transient analyses (zero otherwise)
    pub rate_factor: f64,
}

impl FemState {
    /// Allocates a new instance
    pub fn new(equations: &Equations, config: &Config) -> Result<FemState, StrError> {
        let neq = equations.n_equation;
        if neq == 0 {
            return Err("there are no equations in the system");
        }
        Ok(FemState {
            t: config.control.t_ini,
            dt: (config.control.dt)(config.control.t_ini),
            uu: Vector::new(neq),
            vv: Vector::new(neq),
            uu_old: Vector::new(neq),
            vv_old: Vector::new(neq),
            rate_factor: 0.0,
        })
    }

    /// Returns the current value of a primary variable (zero if fixed)
    pub fn value(&self, equations: &Equations, point_id: PointId, dof: Dof) -> Result<f64, StrError> {
        match equations.eq_number(point_id, dof)?.index() {
            Some(k) => Ok(self.uu[k]),
            None => Ok(0.0),
        }
    }

    /// Reads a JSON file containing the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
