use super::Dof;
use crate::FnTime;
use gemlab::mesh::PointId;

/// Holds a concentrated (nodal) load
#[derive(Clone, Copy, Debug)]
pub struct PointLoad {
    pub point_id: PointId,
    pub dof: Dof,
    pub value: f64,
    pub f: Option<FnTime>,
}

impl PointLoad {
    /// Returns the load at time t
    pub fn value(&self, t: f64) -> f64 {
        match self.f {
            Some(f) => self.value * f(t),
            None => self.value,
        }
    }
}

/// Holds natural boundary conditions (concentrated loads)
pub struct Natural {
    pub all: Vec<PointLoad>,
}

impl Natural {
    /// Allocates a new instance
    pub fn new() -> Self {
        Natural { all: Vec::new() }
    }

    /// Sets concentrated loads at points
    ///
    /// The load at time t is `value · f(t)`, or just `value` if `f` is None.
    pub fn points(&mut self, points: &[PointId], dof: Dof, value: f64, f: Option<FnTime>) -> &mut Self {
        for point_id in points {
            self.all.push(PointLoad {
                point_id: *point_id,
                dof,
                value,
                f,
            });
        }
        self
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Natural;
    use crate::base::Dof;

    #[test]
    fn natural_works() {
        let mut natural = Natural::new();
        natural
            .points(&[1, 2], Dof::Uy, -10.0, Some(|t| t))
            .points(&[3], Dof::T, 4.0, None);
        assert_eq!(natural.all.len(), 3);
        assert_eq!(natural.all[1].point_id, 2);
        assert_eq!(natural.all[1].value(0.5), -5.0);
        assert_eq!(natural.all[2].value(0.5), 4.0);
    }
}
