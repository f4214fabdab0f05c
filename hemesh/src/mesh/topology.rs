use ahash::AHashSet;
use log::warn;

use crate::key::{FaceKey, VertexKey};
use crate::mesh::{Mesh, MeshError, Side};
use crate::traverse::{Breadth, Traversal};
use crate::Arity;
use crate::IteratorExt as _;

impl Mesh {
    /// Gets the vertices with at least one outgoing boundary half-edge, in
    /// insertion order.
    pub fn vertices_on_boundary(&self) -> Vec<VertexKey> {
        self.vertices()
            .filter(|key| self.is_vertex_on_boundary(*key).unwrap_or(false))
            .collect()
    }

    /// Gets the vertices of the first boundary loop in the order in which
    /// they are visited by walking along boundary half-edges.
    ///
    /// See [`Mesh::vertices_on_boundaries`].
    pub fn vertices_on_boundary_ordered(&self) -> Vec<VertexKey> {
        self.vertices_on_boundaries()
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Gets the vertices of every boundary loop.
    ///
    /// Each loop is walked along boundary half-edges, beginning at the source
    /// of the first unvisited boundary half-edge in the order of
    /// [`Mesh::halfedges`]. Every boundary half-edge is visited by exactly one
    /// loop, so a vertex where several loops meet appears in each of them.
    pub fn vertices_on_boundaries(&self) -> Vec<Vec<VertexKey>> {
        let boundaries = self
            .halfedges()
            .filter(|&(u, v)| self.halfedge(u, v) == Some(Side::Boundary))
            .collect::<Vec<_>>();
        let mut visited = AHashSet::with_capacity(boundaries.len());
        let mut loops = Vec::new();
        for (start, next) in boundaries {
            if visited.contains(&(start, next)) {
                continue;
            }
            let mut cycle = vec![start];
            let (mut u, mut v) = (start, next);
            loop {
                visited.insert((u, v));
                if v == start {
                    break;
                }
                cycle.push(v);
                match self.next_boundary_vertex(u, v, &visited) {
                    Some(w) => {
                        u = v;
                        v = w;
                    }
                    None => {
                        warn!("boundary walk from vertex {} ended at vertex {}", start, v);
                        break;
                    }
                }
            }
            loops.push(cycle);
        }
        loops
    }

    /// Gets the edges with a boundary half-edge in the order of
    /// [`Mesh::edges`].
    pub fn edges_on_boundary(&self) -> Vec<(VertexKey, VertexKey)> {
        self.edges()
            .filter(|&(u, v)| self.is_edge_on_boundary(u, v).unwrap_or(false))
            .collect()
    }

    /// Gets the faces with at least one edge on the boundary.
    pub fn faces_on_boundary(&self) -> Vec<FaceKey> {
        self.faces()
            .filter(|key| self.is_face_on_boundary(*key).unwrap_or(false))
            .collect()
    }

    /// Gets the vertices of each connected component.
    ///
    /// Components are ordered by their first vertex in insertion order and
    /// vertices within a component are in breadth-first order.
    pub fn connected_components(&self) -> Vec<Vec<VertexKey>> {
        let mut visited = AHashSet::with_capacity(self.number_of_vertices());
        let mut components = Vec::new();
        for key in self.vertices() {
            if visited.contains(&key) {
                continue;
            }
            let component = Traversal::<_, _, _, Breadth>::new(key, |key| {
                self.halfedge
                    .get(&key)
                    .map(|outgoing| outgoing.keys().collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
            visited.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    /// Returns `true` if the mesh is non-empty and all of its vertices are
    /// connected.
    pub fn is_connected(&self) -> bool {
        !self.is_empty() && self.connected_components().len() == 1
    }

    /// Returns `true` if the topology of the mesh is consistent.
    ///
    /// The following are checked:
    ///
    /// - every vertex has outgoing half-edges (possibly none) and every
    ///   half-edge connects existing vertices;
    /// - the opposite of every half-edge exists and at least one of the two
    ///   refers to a face;
    /// - a half-edge that refers to a face is a half-edge of that face and
    ///   every half-edge of a face refers to that face.
    pub fn is_valid(&self) -> bool {
        if self.vertices().any(|key| !self.halfedge.contains_key(&key)) {
            return false;
        }
        for (&u, outgoing) in self.halfedge.iter() {
            if !self.has_vertex(u) {
                return false;
            }
            for (v, side) in outgoing.iter() {
                if !self.has_vertex(v) {
                    return false;
                }
                let opposite = match self.halfedge(v, u) {
                    Some(opposite) => opposite,
                    None => return false,
                };
                if side.is_boundary() && opposite.is_boundary() {
                    return false;
                }
                if let Side::Face(face) = side {
                    let is_member = self.face_vertices(face).map_or(false, |vertices| {
                        vertices
                            .iter()
                            .copied()
                            .perimeter()
                            .any(|halfedge| halfedge == (u, v))
                    });
                    if !is_member {
                        return false;
                    }
                }
            }
        }
        self.face.iter().all(|(key, face)| {
            face.vertices
                .iter()
                .copied()
                .perimeter()
                .all(|(u, v)| self.halfedge(u, v) == Some(Side::Face(key)))
        })
    }

    /// Returns `true` if all vertices have the same degree and all faces have
    /// the same number of vertices.
    pub fn is_regular(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let degrees = self
            .vertices()
            .map(|key| self.vertex_degree(key).unwrap_or(0))
            .collect::<AHashSet<_>>();
        degrees.len() == 1 && matches!(self.arity(), Some(Arity::Uniform(_)))
    }

    /// Returns `true` if the mesh is a manifold surface, possibly with
    /// boundaries.
    ///
    /// Every vertex must be connected and the faces around it must form a
    /// single fan. The fan of a boundary vertex has exactly one outgoing and
    /// one incoming boundary half-edge at its ends. The fan of an interior
    /// vertex is closed.
    pub fn is_manifold(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.vertices().all(|key| self.is_vertex_manifold(key))
    }

    /// Determines whether the faces of the mesh are consistently oriented.
    ///
    /// # Errors
    ///
    /// Orientability is not computed and this function always returns
    /// [`MeshError::NotImplemented`].
    pub fn is_orientable(&self) -> Result<bool, MeshError> {
        Err(MeshError::NotImplemented("orientability"))
    }

    pub fn is_trimesh(&self) -> bool {
        self.arity() == Some(Arity::Uniform(3))
    }

    pub fn is_quadmesh(&self) -> bool {
        self.arity() == Some(Arity::Uniform(4))
    }

    /// Returns `true` if the mesh has faces and no boundary.
    pub fn is_closed(&self) -> bool {
        self.number_of_faces() > 0
            && !self
                .halfedges()
                .any(|(u, v)| self.halfedge(u, v) == Some(Side::Boundary))
    }

    /// Gets the arity of the faces in the mesh or `None` if the mesh has no
    /// faces.
    pub fn arity(&self) -> Option<Arity> {
        Arity::from_lengths(self.face.values().map(|face| face.vertices.len()))
    }

    /// Gets the Euler characteristic $V - E + F$, where $V$ only counts
    /// connected vertices.
    pub fn euler(&self) -> i64 {
        let v = self
            .vertices()
            .filter(|key| self.is_vertex_connected(*key).unwrap_or(false))
            .count();
        let e = self.number_of_edges();
        let f = self.number_of_faces();
        v as i64 - e as i64 + f as i64
    }

    /// Gets the genus of the mesh.
    ///
    /// Each boundary loop is counted like a face and the genus is computed as
    /// $2 - (\chi + B)$, which is the genus of a non-orientable surface.
    /// Orientation detection is not implemented (see
    /// [`Mesh::is_orientable`]), so this formula is used for all meshes. For
    /// orientable surfaces, the conventional genus is half of this value.
    pub fn genus(&self) -> i64 {
        let boundaries = self.vertices_on_boundaries().len() as i64;
        2 - (self.euler() + boundaries)
    }

    fn is_vertex_manifold(&self, key: VertexKey) -> bool {
        let outgoing = match self.outgoing(key) {
            Ok(outgoing) if !outgoing.is_empty() => outgoing,
            _ => return false,
        };
        let outgoing_boundaries = outgoing.values().filter(|side| side.is_boundary()).count();
        let incoming_boundaries = outgoing
            .keys()
            .filter(|neighbor| self.halfedge(*neighbor, key).map_or(true, Side::is_boundary))
            .count();
        if outgoing_boundaries != incoming_boundaries || outgoing_boundaries > 1 {
            return false;
        }
        let ordered = match self.vertex_neighbors(key, true) {
            Ok(ordered) => ordered,
            Err(_) => return false,
        };
        if ordered.len() != outgoing.len() {
            return false;
        }
        match ordered.last() {
            Some(last) if outgoing_boundaries == 1 => {
                self.halfedge(*last, key) == Some(Side::Boundary)
            }
            _ => true,
        }
    }

    // Chooses the next vertex of a boundary walk arriving at `v` from `u`.
    fn next_boundary_vertex(
        &self,
        u: VertexKey,
        v: VertexKey,
        visited: &AHashSet<(VertexKey, VertexKey)>,
    ) -> Option<VertexKey> {
        let candidates = self
            .halfedge
            .get(&v)?
            .iter()
            .filter(|&(w, side)| side.is_boundary() && !visited.contains(&(v, w)))
            .map(|(w, _)| w)
            .collect::<Vec<_>>();
        candidates
            .iter()
            .copied()
            .find(|w| *w != u)
            .or_else(|| candidates.first().copied())
    }
}

#[cfg(test)]
mod tests {
    use crate::attribute::Attributes;
    use crate::key::{FaceKey, VertexKey};
    use crate::mesh::tests::{grid, keys, quad, tetrahedron, triangulated_square};
    use crate::mesh::{Mesh, MeshError};
    use crate::Arity;

    #[test]
    fn quad_boundary() {
        let mesh = quad();

        assert_eq!(keys(&[0, 1, 2, 3]), mesh.vertices_on_boundary());
        assert_eq!(4, mesh.edges_on_boundary().len());
        assert_eq!(vec![FaceKey::new(0)], mesh.faces_on_boundary());
        // Boundary half-edges run against the cycle of the face.
        assert_eq!(vec![keys(&[0, 3, 2, 1])], mesh.vertices_on_boundaries());
        assert_eq!(keys(&[0, 3, 2, 1]), mesh.vertices_on_boundary_ordered());
    }

    #[test]
    fn triangulated_square_topology() {
        let mesh = triangulated_square();

        assert_eq!(5, mesh.number_of_edges());
        assert_eq!(1, mesh.euler());
        assert!(mesh.is_manifold());
        assert!(mesh.is_trimesh());
        assert!(mesh.is_valid());
        assert!(mesh.is_connected());
        assert!(!mesh.is_closed());
        assert!(!mesh.is_regular());
        assert_eq!(0, mesh.genus());
    }

    #[test]
    fn grid_topology() {
        let mesh = grid();

        assert_eq!(12, mesh.vertices_on_boundary().len());
        assert_eq!(12, mesh.edges_on_boundary().len());
        assert_eq!(8, mesh.faces_on_boundary().len());
        let loops = mesh.vertices_on_boundaries();
        assert_eq!(1, loops.len());
        assert_eq!(12, loops[0].len());
        assert_eq!(1, mesh.euler());
        assert!(mesh.is_manifold());
        assert_eq!(Some(Arity::Uniform(4)), mesh.arity());
    }

    #[test]
    fn closed_tetrahedron() {
        let mesh = tetrahedron();

        assert!(mesh.is_valid());
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        assert!(mesh.is_regular());
        assert!(mesh.vertices_on_boundary().is_empty());
        assert!(mesh.vertices_on_boundaries().is_empty());
        assert_eq!(2, mesh.euler());
        assert_eq!(0, mesh.genus());
        assert_eq!(Err(MeshError::NotImplemented("orientability")), mesh.is_orientable());
    }

    #[test]
    fn grid_with_hole() {
        let mut mesh = grid();
        mesh.delete_face(FaceKey::new(4)).unwrap();

        assert!(mesh.is_valid());
        assert!(mesh.is_manifold());
        assert_eq!(2, mesh.vertices_on_boundaries().len());
        assert_eq!(16, mesh.vertices_on_boundary().len());
        assert_eq!(0, mesh.euler());
        assert_eq!(0, mesh.genus());
    }

    #[test]
    fn pinched_vertex_is_not_manifold() {
        // Two triangles that only share vertex 0.
        let mesh = Mesh::from_vertices_and_faces(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 0.0, 0.0],
                [-1.0, -1.0, 0.0],
            ],
            vec![vec![0usize, 1, 2], vec![0, 3, 4]],
        )
        .unwrap();

        assert!(mesh.is_valid());
        assert!(!mesh.is_manifold());
        assert!(mesh.is_connected());
        assert_eq!(2, mesh.vertices_on_boundaries().len());
    }

    #[test]
    fn components_and_isolated_vertices() {
        let mut mesh = quad();
        mesh.add_vertex(None, Attributes::new());

        assert_eq!(2, mesh.connected_components().len());
        assert!(!mesh.is_connected());
        assert!(!mesh.is_manifold());
        // Unconnected vertices are not counted.
        assert_eq!(1, mesh.euler());
        assert!(!Mesh::new().is_connected());
        assert!(!Mesh::new().is_manifold());
        assert_eq!(None, Mesh::new().arity());
    }

    #[test]
    fn corrupt_topology_is_invalid() {
        let mut mesh = triangulated_square();
        // Overwrite a half-edge of face 0 with face 1 by adding a face with an
        // inconsistent orientation.
        mesh.add_face(keys(&[0, 1, 3]), Some(FaceKey::new(1)), Attributes::new())
            .unwrap();
        assert!(!mesh.is_valid());
        assert!(mesh.vertex_neighbors(VertexKey::new(0), true).is_ok());
    }
}
