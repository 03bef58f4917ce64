use gemlab::mesh::{Cell, Mesh, Point, PointId};
use gemlab::shapes::GeoKind;

/// Holds samples of meshes used in tests and documentation
///
/// All cells carry attribute 1.
pub struct SampleMeshes {}

fn hex8(id: usize, points: [PointId; 8]) -> Cell {
    Cell {
        id,
        attribute: 1,
        kind: GeoKind::Hex8,
        points: points.to_vec(),
    }
}

impl SampleMeshes {
    /// Returns a bar of `nx` Hex8 cells along x with cross-section `ly × lz`
    ///
    /// ```text
    ///     section i (x = i·lx/nx):
    ///
    ///       z
    ///       ↑
    ///   4i+3 ----- 4i+2
    ///       |     |
    ///       |     |
    ///     4i ----- 4i+1  → y
    /// ```
    ///
    /// Each cell follows the usual Hex8 numbering with nodes 0-3 on the z = 0 face.
    pub fn bar_hex8(nx: usize, lx: f64, ly: f64, lz: f64) -> Mesh {
        let corners = [(0.0, 0.0), (ly, 0.0), (ly, lz), (0.0, lz)];
        let mut points = Vec::new();
        for i in 0..(nx + 1) {
            let x = (i as f64) * lx / (nx as f64);
            for (y, z) in &corners {
                let id = points.len();
                points.push(Point {
                    id,
                    marker: 0,
                    coords: vec![x, *y, *z],
                });
            }
        }
        let cells = (0..nx)
            .map(|i| {
                let (a, b) = (4 * i, 4 * (i + 1));
                hex8(i, [a, b, b + 1, a + 1, a + 3, b + 3, b + 2, a + 2])
            })
            .collect();
        Mesh { ndim: 3, points, cells }
    }

    /// Returns two unit cubes stacked along z and separated by `gap`
    ///
    /// ```text
    ///   upper cube: points 8..15, bottom face z = 1 + gap (points 8, 9, 10, 11)
    ///   lower cube: points 0..7,  top face    z = 1       (points 4, 5, 6, 7)
    /// ```
    ///
    /// Returns the mesh (cell 0 is the lower cube), the top facet of the lower cube (normal +z),
    /// and the bottom facet of the upper cube (normal −z).
    pub fn two_cubes(gap: f64) -> (Mesh, Vec<PointId>, Vec<PointId>) {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let levels = [0.0, 1.0, 1.0 + gap, 2.0 + gap];
        let mut points = Vec::new();
        for z in &levels {
            for (x, y) in &square {
                let id = points.len();
                points.push(Point {
                    id,
                    marker: 0,
                    coords: vec![*x, *y, *z],
                });
            }
        }
        let cells = vec![hex8(0, [0, 1, 2, 3, 4, 5, 6, 7]), hex8(1, [8, 9, 10, 11, 12, 13, 14, 15])];
        let mesh = Mesh { ndim: 3, points, cells };
        (mesh, vec![4, 5, 6, 7], vec![8, 11, 10, 9])
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
