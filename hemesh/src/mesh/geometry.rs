use nalgebra::{Point3, Vector3};

use crate::attribute::{AttributeView, Value};
use crate::key::{FaceKey, VertexKey};
use crate::mesh::{Mesh, MeshError};
use crate::IteratorExt as _;

impl Mesh {
    /// Gets the position of a vertex from its `x`, `y`, and `z` attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex does not exist or if any of its
    /// coordinates is missing or is not numeric.
    pub fn vertex_coordinates(&self, key: VertexKey) -> Result<Point3<f64>, MeshError> {
        let data = self.vertex_data(key)?;
        let coordinate = |name| {
            data.get(name)
                .and_then(Value::as_f64)
                .ok_or(MeshError::Geometry)
        };
        Ok(Point3::new(coordinate("x")?, coordinate("y")?, coordinate("z")?))
    }

    pub fn set_vertex_coordinates(
        &mut self,
        key: VertexKey,
        position: Point3<f64>,
    ) -> Result<(), MeshError> {
        self.set_vertex_attributes(key, &["x", "y", "z"], [position.x, position.y, position.z])
    }

    pub fn face_coordinates(&self, key: FaceKey) -> Result<Vec<Point3<f64>>, MeshError> {
        self.face_vertices(key)?
            .iter()
            .map(|vertex| self.vertex_coordinates(*vertex))
            .collect()
    }

    /// Gets the mean of the positions of the vertices of a face.
    pub fn face_centroid(&self, key: FaceKey) -> Result<Point3<f64>, MeshError> {
        centroid(self.face_coordinates(key)?)
    }

    /// Gets the unit normal of a face.
    ///
    /// The normal is computed with Newell's method, so non-planar faces have
    /// a well-defined normal as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is degenerate and has no area.
    pub fn face_normal(&self, key: FaceKey) -> Result<Vector3<f64>, MeshError> {
        let normal = newell(&self.face_coordinates(key)?);
        if approx::abs_diff_eq!(normal.norm(), 0.0) {
            Err(MeshError::Geometry)
        }
        else {
            Ok(normal.normalize())
        }
    }

    /// Gets the area of a face, which is exact for planar faces.
    pub fn face_area(&self, key: FaceKey) -> Result<f64, MeshError> {
        Ok(newell(&self.face_coordinates(key)?).norm() * 0.5)
    }

    /// Gets the vector from `u` to `v`.
    pub fn edge_vector(&self, u: VertexKey, v: VertexKey) -> Result<Vector3<f64>, MeshError> {
        if !self.has_edge(u, v) {
            return Err(MeshError::EdgeNotFound(u, v));
        }
        Ok(self.vertex_coordinates(v)? - self.vertex_coordinates(u)?)
    }

    pub fn edge_length(&self, u: VertexKey, v: VertexKey) -> Result<f64, MeshError> {
        self.edge_vector(u, v).map(|vector| vector.norm())
    }

    pub fn edge_midpoint(&self, u: VertexKey, v: VertexKey) -> Result<Point3<f64>, MeshError> {
        let vector = self.edge_vector(u, v)?;
        Ok(self.vertex_coordinates(u)? + vector * 0.5)
    }

    /// Gets the unit normal of a vertex as the normalized mean of the normals
    /// of its faces. Degenerate faces are ignored.
    pub fn vertex_normal(&self, key: VertexKey) -> Result<Vector3<f64>, MeshError> {
        let normal = self
            .vertex_faces(key, false)?
            .into_iter()
            .filter_map(|face| self.face_normal(face).ok())
            .fold(Vector3::zeros(), |sum, normal| sum + normal);
        if approx::abs_diff_eq!(normal.norm(), 0.0) {
            Err(MeshError::Geometry)
        }
        else {
            Ok(normal.normalize())
        }
    }

    /// Gets the mean of the positions of all vertices.
    pub fn centroid(&self) -> Result<Point3<f64>, MeshError> {
        centroid(
            self.vertices()
                .map(|key| self.vertex_coordinates(key))
                .collect::<Result<Vec<_>, _>>()?,
        )
    }

    /// Gets the sum of the areas of all faces.
    pub fn area(&self) -> Result<f64, MeshError> {
        self.faces().map(|key| self.face_area(key)).sum()
    }

    /// Gets the lower and upper corners of the axis-aligned bounding box of
    /// all vertices.
    pub fn bounding_box(&self) -> Result<(Point3<f64>, Point3<f64>), MeshError> {
        let mut positions = self.vertices().map(|key| self.vertex_coordinates(key));
        let first = positions.next().ok_or(MeshError::Geometry)??;
        positions.try_fold((first, first), |(lower, upper), position| {
            let position = position?;
            Ok((lower.inf(&position), upper.sup(&position)))
        })
    }

    /// Determines whether a point lies inside of a closed mesh.
    ///
    /// # Errors
    ///
    /// Containment is not computed and this function always returns
    /// [`MeshError::NotImplemented`].
    pub fn is_point_in_polyhedron(&self, _: &Point3<f64>) -> Result<bool, MeshError> {
        Err(MeshError::NotImplemented("point in polyhedron"))
    }
}

fn centroid(positions: Vec<Point3<f64>>) -> Result<Point3<f64>, MeshError> {
    if positions.is_empty() {
        return Err(MeshError::Geometry);
    }
    let n = positions.len() as f64;
    let sum = positions
        .iter()
        .fold(Vector3::zeros(), |sum, position| sum + position.coords);
    Ok(Point3::from(sum / n))
}

// Sum of the cross products of consecutive positions. Its length is twice the
// area of a planar polygon.
fn newell(positions: &[Point3<f64>]) -> Vector3<f64> {
    positions
        .iter()
        .perimeter()
        .fold(Vector3::zeros(), |sum, (a, b)| sum + a.coords.cross(&b.coords))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::{Point3, Vector3};

    use crate::attribute::Attributes;
    use crate::attributes;
    use crate::key::{FaceKey, VertexKey};
    use crate::mesh::tests::{grid, quad, tetrahedron, triangulated_square};
    use crate::mesh::{Mesh, MeshError};

    #[test]
    fn face_geometry() {
        let mesh = quad();
        let face = FaceKey::new(0);

        assert_eq!(Point3::new(0.5, 0.5, 0.0), mesh.face_centroid(face).unwrap());
        assert_eq!(Vector3::z(), mesh.face_normal(face).unwrap());
        assert_abs_diff_eq!(1.0, mesh.face_area(face).unwrap());
        assert_eq!(4, mesh.face_coordinates(face).unwrap().len());
    }

    #[test]
    fn edge_geometry() {
        let mesh = triangulated_square();
        let (a, c) = (VertexKey::new(0), VertexKey::new(2));

        assert_eq!(Vector3::new(1.0, 1.0, 0.0), mesh.edge_vector(a, c).unwrap());
        assert_abs_diff_eq!(2f64.sqrt(), mesh.edge_length(c, a).unwrap());
        assert_eq!(Point3::new(0.5, 0.5, 0.0), mesh.edge_midpoint(a, c).unwrap());
        assert_eq!(
            Err(MeshError::EdgeNotFound(VertexKey::new(1), VertexKey::new(3))),
            mesh.edge_length(VertexKey::new(1), VertexKey::new(3))
        );
    }

    #[test]
    fn mesh_geometry() {
        let mesh = grid();

        assert_abs_diff_eq!(9.0, mesh.area().unwrap());
        assert_eq!(Point3::new(1.5, 1.5, 0.0), mesh.centroid().unwrap());
        assert_eq!(
            (Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 0.0)),
            mesh.bounding_box().unwrap()
        );
        assert_eq!(Vector3::z(), mesh.vertex_normal(VertexKey::new(5)).unwrap());
        assert_eq!(Err(MeshError::Geometry), Mesh::new().bounding_box());
        assert_eq!(Err(MeshError::Geometry), Mesh::new().centroid());
    }

    #[test]
    fn closed_geometry() {
        let mesh = tetrahedron();
        assert_abs_diff_eq!(1.5 + 3f64.sqrt() / 2.0, mesh.area().unwrap(), epsilon = 1e-12);
        assert_eq!(
            Err(MeshError::NotImplemented("point in polyhedron")),
            mesh.is_point_in_polyhedron(&Point3::origin())
        );
    }

    #[test]
    fn coordinates_are_attributes() {
        let mut mesh = quad();
        let key = VertexKey::new(2);
        mesh.set_vertex_coordinates(key, Point3::new(2.0, 3.0, 4.0)).unwrap();
        assert_eq!(Point3::new(2.0, 3.0, 4.0), mesh.vertex_coordinates(key).unwrap());

        mesh.set_vertex_attribute(key, "z", "high").unwrap();
        assert_eq!(Err(MeshError::Geometry), mesh.vertex_coordinates(key));

        // Positions default to the origin.
        let added = mesh.add_vertex(None, Attributes::new());
        assert_eq!(Point3::origin(), mesh.vertex_coordinates(added).unwrap());
        let mut mesh = Mesh::with_defaults(attributes! {}, attributes! {}, attributes! {});
        let added = mesh.add_vertex(None, attributes! { "x" => 1 });
        assert_eq!(Err(MeshError::Geometry), mesh.vertex_coordinates(added));
    }

    #[test]
    fn degenerate_face_has_no_normal() {
        let mesh = Mesh::from_vertices_and_faces(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![vec![0usize, 1, 2]],
        )
        .unwrap();
        assert_eq!(Err(MeshError::Geometry), mesh.face_normal(FaceKey::new(0)));
        assert_abs_diff_eq!(0.0, mesh.face_area(FaceKey::new(0)).unwrap());
    }
}
