use super::{ConvergenceNorms, Counters, FemState, IntegrationParams, ModelHistory, QuasiNewton};
use crate::StrError;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds all mutable data of the solver and the model for restarts
///
/// The floats are written with `float_roundtrip`; thus, loading a checkpoint into a
/// freshly allocated solver of identical configuration reproduces the vectors bit by bit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// State (time, primary unknowns, and rates)
    pub state: FemState,

    /// Accumulated increment of the time step U_i
    pub duu: Vector,

    /// Last direction u
    pub mdu: Vector,

    /// Residual R0
    pub rr0: Vector,

    /// Residual R1
    pub rr1: Vector,

    /// Reactions at the prescribed equations
    pub reactions: Vector,

    /// Convergence norms
    pub norms: ConvergenceNorms,

    /// Counters
    pub counters: Counters,

    /// Time integration parameters
    pub params: IntegrationParams,

    /// Quasi-Newton buffers
    pub quasi_newton: QuasiNewton,

    /// Internal history of domains, constraints, and contact surfaces
    pub history: ModelHistory,
}

impl Checkpoint {
    /// Reads a JSON file containing the checkpoint
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
        let checkpoint = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(checkpoint)
    }

    /// Writes a JSON file with the checkpoint
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
