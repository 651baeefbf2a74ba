//! Structured interval meshes.
//!
//! Cells are numbered left to right. Every face has an owner cell whose
//! outward unit normal is stored with the face; interior faces also carry a
//! neighbour. A periodic mesh closes the interval with one interior face
//! between the last and the first cell and has no boundary faces.

use crate::error::{Result, SolverError};

/// Boundary indicator of the left end of the interval.
pub const BOUNDARY_LEFT: u8 = 0;
/// Boundary indicator of the right end of the interval.
pub const BOUNDARY_RIGHT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub owner: usize,
    /// Local node of the owner cell lying on the face
    pub owner_node: usize,
    /// Neighbour cell and its local node, `None` on the boundary
    pub neighbor: Option<(usize, usize)>,
    /// Outward normal of the owner cell
    pub normal: f64,
    /// Face position as seen from the owner
    pub x: f64,
    pub boundary_id: Option<u8>,
}

impl Face {
    pub fn is_interior(&self) -> bool {
        self.neighbor.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<f64>,
    periodic: bool,
    faces: Vec<Face>,
}

impl Mesh {
    /// Uniform mesh of `n_cells` cells on `[left, right]`.
    pub fn uniform(left: f64, right: f64, n_cells: usize, periodic: bool) -> Result<Self> {
        if n_cells == 0 {
            return Err(SolverError::Configuration(
                "mesh needs at least one cell".to_string(),
            ));
        }
        let h = (right - left) / n_cells as f64;
        let vertices = (0..=n_cells).map(|i| left + i as f64 * h).collect();
        Self::from_vertices(vertices, periodic)
    }

    /// Mesh from strictly increasing vertex coordinates.
    pub fn from_vertices(vertices: Vec<f64>, periodic: bool) -> Result<Self> {
        if vertices.len() < 2 {
            return Err(SolverError::Configuration(format!(
                "mesh needs at least two vertices, got {}",
                vertices.len()
            )));
        }
        if let Some(w) = vertices.windows(2).find(|w| !(w[1] > w[0])) {
            return Err(SolverError::Configuration(format!(
                "vertices must be strictly increasing, found {} followed by {}",
                w[0], w[1]
            )));
        }

        let n_cells = vertices.len() - 1;
        let mut faces = Vec::with_capacity(n_cells + 1);
        for cell in 0..n_cells - 1 {
            faces.push(Face {
                owner: cell,
                owner_node: 1,
                neighbor: Some((cell + 1, 0)),
                normal: 1.0,
                x: vertices[cell + 1],
                boundary_id: None,
            });
        }
        let right = vertices[n_cells];
        if periodic {
            faces.push(Face {
                owner: n_cells - 1,
                owner_node: 1,
                neighbor: Some((0, 0)),
                normal: 1.0,
                x: right,
                boundary_id: None,
            });
        } else {
            faces.push(Face {
                owner: 0,
                owner_node: 0,
                neighbor: None,
                normal: -1.0,
                x: vertices[0],
                boundary_id: Some(BOUNDARY_LEFT),
            });
            faces.push(Face {
                owner: n_cells - 1,
                owner_node: 1,
                neighbor: None,
                normal: 1.0,
                x: right,
                boundary_id: Some(BOUNDARY_RIGHT),
            });
        }

        Ok(Self {
            vertices,
            periodic,
            faces,
        })
    }

    pub fn n_cells(&self) -> usize {
        self.vertices.len() - 1
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(|f| !f.is_interior())
    }

    /// Left and right vertex of a cell.
    pub fn cell_bounds(&self, cell: usize) -> (f64, f64) {
        (self.vertices[cell], self.vertices[cell + 1])
    }

    pub fn cell_size(&self, cell: usize) -> f64 {
        self.vertices[cell + 1] - self.vertices[cell]
    }

    /// Cell measure; equals the size in one dimension.
    pub fn cell_volume(&self, cell: usize) -> f64 {
        self.cell_size(cell)
    }

    pub fn min_cell_size(&self) -> f64 {
        (0..self.n_cells())
            .map(|c| self.cell_size(c))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn left(&self) -> f64 {
        self.vertices[0]
    }

    pub fn right(&self) -> f64 {
        self.vertices[self.n_cells()]
    }

    pub fn length(&self) -> f64 {
        self.right() - self.left()
    }

    /// Bisects every cell once.
    pub fn refine(&self) -> Result<Self> {
        let mut vertices = Vec::with_capacity(2 * self.vertices.len() - 1);
        for w in self.vertices.windows(2) {
            vertices.push(w[0]);
            vertices.push(0.5 * (w[0] + w[1]));
        }
        vertices.push(self.right());
        Self::from_vertices(vertices, self.periodic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_mesh_has_only_interior_faces() {
        let mesh = Mesh::uniform(0.0, 1.0, 4, true).unwrap();
        assert_eq!(mesh.faces().len(), 4);
        assert!(mesh.faces().iter().all(Face::is_interior));
        let closing = mesh.faces()[3];
        assert_eq!(closing.owner, 3);
        assert_eq!(closing.neighbor, Some((0, 0)));
    }

    #[test]
    fn bounded_mesh_has_two_boundary_faces() {
        let mesh = Mesh::uniform(-1.0, 1.0, 3, false).unwrap();
        let ids: Vec<_> = mesh.boundary_faces().map(|f| (f.boundary_id, f.normal)).collect();
        assert_eq!(
            ids,
            vec![(Some(BOUNDARY_LEFT), -1.0), (Some(BOUNDARY_RIGHT), 1.0)]
        );
        assert!((mesh.cell_size(1) - 2.0 / 3.0).abs() < 1e-14);
    }

    #[test]
    fn refine_halves_cells() {
        let mesh = Mesh::from_vertices(vec![0.0, 0.5, 2.0], false).unwrap();
        let fine = mesh.refine().unwrap();
        assert_eq!(fine.n_cells(), 4);
        assert!((fine.min_cell_size() - 0.25).abs() < 1e-14);
        assert_eq!(fine.right(), 2.0);
    }

    #[test]
    fn rejects_unsorted_vertices() {
        assert!(Mesh::from_vertices(vec![0.0, 1.0, 1.0], false).is_err());
        assert!(Mesh::uniform(0.0, 1.0, 0, true).is_err());
    }
}
