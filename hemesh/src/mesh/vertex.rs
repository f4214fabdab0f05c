use log::warn;

use crate::attribute::{AttributeView, AttributeViewMut, Attributes, Layered, LayeredMut, Value};
use crate::key::{FaceKey, VertexKey};
use crate::mesh::{matches_conditions, unique_in_order, Mesh, MeshError, Side, WALK_LIMIT};
use crate::traverse::{Breadth, Traversal};

impl Mesh {
    /// Gets the neighbors of a vertex.
    ///
    /// If `ordered` is `false`, neighbors are returned in the order in which
    /// their edges were created. Otherwise, neighbors are ordered by walking
    /// around the vertex through the faces incident to it. If the vertex is on
    /// the boundary, the walk begins with the neighbor across an outgoing
    /// boundary half-edge, so that the neighbors across boundary edges are
    /// first and last.
    ///
    /// The ordered walk stops at the boundary, so it only covers all neighbors
    /// if the faces around the vertex form a single fan.
    pub fn vertex_neighbors(
        &self,
        key: VertexKey,
        ordered: bool,
    ) -> Result<Vec<VertexKey>, MeshError> {
        let outgoing = self.outgoing(key)?;
        let neighbors = outgoing.keys().collect::<Vec<_>>();
        if !ordered || neighbors.len() < 2 {
            return Ok(neighbors);
        }
        let start = outgoing
            .iter()
            .find(|(_, side)| side.is_boundary())
            .map_or(neighbors[0], |(neighbor, _)| neighbor);
        let mut ordered = vec![start];
        let mut side = self.halfedge(start, key);
        let mut steps = 0;
        while let Some(Side::Face(face)) = side {
            if steps == WALK_LIMIT {
                warn!("walk around vertex {} exceeded {} steps", key, WALK_LIMIT);
                break;
            }
            steps += 1;
            let neighbor = self.face_vertex_descendant(face, key, 1)?;
            if neighbor == start {
                break;
            }
            ordered.push(neighbor);
            side = self.halfedge(neighbor, key);
        }
        Ok(ordered)
    }

    /// Gets the number of neighbors of a vertex.
    pub fn vertex_degree(&self, key: VertexKey) -> Result<usize, MeshError> {
        self.outgoing(key).map(|outgoing| outgoing.len())
    }

    /// Gets the least vertex degree in the mesh or zero if the mesh is empty.
    pub fn vertex_min_degree(&self) -> usize {
        self.vertex_degree_range().0
    }

    /// Gets the greatest vertex degree in the mesh or zero if the mesh is
    /// empty.
    pub fn vertex_max_degree(&self) -> usize {
        self.vertex_degree_range().1
    }

    /// Gets the faces incident to a vertex.
    ///
    /// If `ordered` is `true`, faces are ordered like the neighbors returned
    /// by [`Mesh::vertex_neighbors`]: each face is the face on the outgoing
    /// half-edge toward the corresponding neighbor.
    pub fn vertex_faces(&self, key: VertexKey, ordered: bool) -> Result<Vec<FaceKey>, MeshError> {
        self.vertex_sides(key, ordered)
            .map(|sides| sides.into_iter().filter_map(Side::face).collect())
    }

    /// Gets the sides of the outgoing half-edges of a vertex, including
    /// boundaries.
    ///
    /// Unordered sides are distinct. Ordered sides are given per ordered
    /// neighbor and may repeat.
    pub fn vertex_sides(&self, key: VertexKey, ordered: bool) -> Result<Vec<Side>, MeshError> {
        let outgoing = self.outgoing(key)?;
        if ordered {
            Ok(self
                .vertex_neighbors(key, true)?
                .into_iter()
                .filter_map(|neighbor| outgoing.get(&neighbor))
                .collect())
        }
        else {
            Ok(unique_in_order(outgoing.values()))
        }
    }

    /// Gets the vertices within `ring` edges of a vertex, excluding the vertex
    /// itself.
    ///
    /// Vertices are ordered by their distance from `key`.
    pub fn vertex_neighborhood(
        &self,
        key: VertexKey,
        ring: usize,
    ) -> Result<Vec<VertexKey>, MeshError> {
        self.outgoing(key)?;
        Ok(Traversal::<_, _, _, Breadth>::new(key, |key| {
            self.halfedge
                .get(&key)
                .map(|outgoing| outgoing.keys().collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .skip(1)
        .take_while(|(_, depth)| *depth <= ring)
        .map(|(key, _)| key)
        .collect())
    }

    /// Returns `true` if any outgoing half-edge of the vertex is on the
    /// boundary.
    pub fn is_vertex_on_boundary(&self, key: VertexKey) -> Result<bool, MeshError> {
        self.outgoing(key)
            .map(|outgoing| outgoing.values().any(Side::is_boundary))
    }

    /// Returns `true` if the vertex has at least one neighbor.
    pub fn is_vertex_connected(&self, key: VertexKey) -> Result<bool, MeshError> {
        self.vertex_degree(key).map(|degree| degree > 0)
    }

    /// Gets a view of the attributes of a vertex layered over the default
    /// vertex attributes.
    pub fn vertex_data(&self, key: VertexKey) -> Result<Layered<'_>, MeshError> {
        let explicit = self.vertex.get(&key).ok_or(MeshError::VertexNotFound(key))?;
        Ok(Layered::new(&self.dva, Some(explicit)))
    }

    pub fn vertex_data_mut(&mut self, key: VertexKey) -> Result<LayeredMut<'_>, MeshError> {
        let explicit = self
            .vertex
            .get_mut(&key)
            .ok_or(MeshError::VertexNotFound(key))?;
        Ok(LayeredMut::new(&self.dva, explicit))
    }

    /// Gets the effective value of a vertex attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex does not exist. An attribute that has
    /// neither an explicit nor a default value is `None`.
    pub fn vertex_attribute(&self, key: VertexKey, name: &str) -> Result<Option<Value>, MeshError> {
        Ok(self.vertex_data(key)?.get(name).cloned())
    }

    /// Writes an explicit value for a vertex attribute.
    pub fn set_vertex_attribute<T>(
        &mut self,
        key: VertexKey,
        name: &str,
        value: T,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        self.vertex_data_mut(key)?.set(name, value.into());
        Ok(())
    }

    /// Removes the explicit value of a vertex attribute, if any.
    pub fn unset_vertex_attribute(&mut self, key: VertexKey, name: &str) -> Result<(), MeshError> {
        self.vertex_data_mut(key)?.unset(name);
        Ok(())
    }

    /// Gets all effective attributes of a vertex.
    pub fn vertex_attributes(&self, key: VertexKey) -> Result<Attributes, MeshError> {
        self.vertex_data(key).map(|data| data.to_attributes())
    }

    /// Gets the effective values of the named attributes of a vertex, in the
    /// order of `names`.
    pub fn vertex_attributes_by(
        &self,
        key: VertexKey,
        names: &[&str],
    ) -> Result<Vec<Option<Value>>, MeshError> {
        let data = self.vertex_data(key)?;
        Ok(names.iter().map(|name| data.get(name).cloned()).collect())
    }

    /// Writes explicit values for the named attributes of a vertex. Names and
    /// values are paired in order.
    pub fn set_vertex_attributes<I>(
        &mut self,
        key: VertexKey,
        names: &[&str],
        values: I,
    ) -> Result<(), MeshError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut data = self.vertex_data_mut(key)?;
        for (name, value) in names.iter().zip(values) {
            data.set(name, value.into());
        }
        Ok(())
    }

    /// Gets the effective value of an attribute for many vertices.
    ///
    /// If `keys` is `None`, all vertices are queried in insertion order.
    pub fn vertices_attribute(
        &self,
        name: &str,
        keys: Option<&[VertexKey]>,
    ) -> Result<Vec<Option<Value>>, MeshError> {
        self.select_vertices(keys)?
            .into_iter()
            .map(|key| self.vertex_attribute(key, name))
            .collect()
    }

    /// Gets the effective values of the named attributes for many vertices.
    pub fn vertices_attributes(
        &self,
        names: &[&str],
        keys: Option<&[VertexKey]>,
    ) -> Result<Vec<Vec<Option<Value>>>, MeshError> {
        self.select_vertices(keys)?
            .into_iter()
            .map(|key| self.vertex_attributes_by(key, names))
            .collect()
    }

    /// Writes an explicit value of an attribute for many vertices.
    ///
    /// If any of the vertices does not exist, no values are written.
    pub fn set_vertices_attribute<T>(
        &mut self,
        name: &str,
        value: T,
        keys: Option<&[VertexKey]>,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        let value = value.into();
        for key in self.select_vertices(keys)? {
            self.set_vertex_attribute(key, name, value.clone())?;
        }
        Ok(())
    }

    /// Gets the vertices whose effective attributes equal all of the given
    /// values.
    pub fn vertices_where(&self, conditions: &Attributes) -> Vec<VertexKey> {
        self.vertices()
            .filter(|key| {
                self.vertex_data(*key)
                    .map_or(false, |data| matches_conditions(conditions, |name| data.get(name)))
            })
            .collect()
    }

    fn select_vertices(&self, keys: Option<&[VertexKey]>) -> Result<Vec<VertexKey>, MeshError> {
        match keys {
            Some(keys) => {
                if let Some(key) = keys.iter().find(|key| !self.has_vertex(**key)) {
                    return Err(MeshError::VertexNotFound(*key));
                }
                Ok(keys.to_vec())
            }
            None => Ok(self.vertices().collect()),
        }
    }

    fn vertex_degree_range(&self) -> (usize, usize) {
        Mesh::degree_range(
            self.vertices()
                .filter_map(|key| self.halfedge.get(&key).map(|outgoing| outgoing.len())),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::attribute::{AttributeView, AttributeViewMut, Value};
    use crate::attributes;
    use crate::key::{FaceKey, VertexKey};
    use crate::mesh::tests::{grid, keys, triangulated_square};
    use crate::mesh::{MeshError, Side};

    #[test]
    fn ordered_neighbors_of_boundary_vertex() {
        let mesh = triangulated_square();
        let key = VertexKey::new(0);

        assert_eq!(keys(&[1, 2, 3]), mesh.vertex_neighbors(key, false).unwrap());
        assert_eq!(keys(&[3, 2, 1]), mesh.vertex_neighbors(key, true).unwrap());
        assert_eq!(
            vec![FaceKey::new(1), FaceKey::new(0)],
            mesh.vertex_faces(key, true).unwrap()
        );
        assert_eq!(
            vec![Side::Face(FaceKey::new(0)), Side::Face(FaceKey::new(1)), Side::Boundary],
            mesh.vertex_sides(key, false).unwrap()
        );
    }

    #[test]
    fn ordered_neighbors_of_interior_vertex() {
        let mesh = grid();
        let key = VertexKey::new(5);
        let neighbors = mesh.vertex_neighbors(key, true).unwrap();

        assert_eq!(4, neighbors.len());
        for neighbor in keys(&[1, 4, 6, 9]) {
            assert!(neighbors.contains(&neighbor));
        }
        // Consecutive neighbors share a face with the vertex.
        let faces = mesh.vertex_faces(key, false).unwrap();
        for window in neighbors.windows(2) {
            assert!(faces.iter().any(|face| {
                let vertices = mesh.face_vertices(*face).unwrap();
                vertices.contains(&window[0]) && vertices.contains(&window[1])
            }));
        }
        assert_eq!(4, mesh.vertex_faces(key, true).unwrap().len());
        assert!(!mesh.is_vertex_on_boundary(key).unwrap());
        assert!(mesh.is_vertex_on_boundary(VertexKey::new(1)).unwrap());
    }

    #[test]
    fn degrees() {
        let mesh = grid();
        assert_eq!(2, mesh.vertex_min_degree());
        assert_eq!(4, mesh.vertex_max_degree());
        assert_eq!(3, mesh.vertex_degree(VertexKey::new(1)).unwrap());
        assert_eq!(
            Err(MeshError::VertexNotFound(VertexKey::new(99))),
            mesh.vertex_degree(VertexKey::new(99))
        );
    }

    #[test]
    fn neighborhood_rings() {
        let mesh = grid();
        let key = VertexKey::new(0);

        let mut ring = mesh.vertex_neighborhood(key, 1).unwrap();
        ring.sort();
        assert_eq!(keys(&[1, 4]), ring);

        let mut rings = mesh.vertex_neighborhood(key, 2).unwrap();
        rings.sort();
        assert_eq!(keys(&[1, 2, 4, 5, 8]), rings);
    }

    #[test]
    fn default_attributes_broadcast() {
        let mut mesh = grid();
        mesh.update_default_vertex_attributes(attributes! { "weight" => 1.0 });
        mesh.set_vertex_attribute(VertexKey::new(3), "weight", 2.0).unwrap();

        assert_eq!(
            Some(Value::Float(2.0)),
            mesh.vertex_attribute(VertexKey::new(3), "weight").unwrap()
        );
        for key in mesh.vertices().filter(|key| *key != VertexKey::new(3)) {
            assert_eq!(Some(Value::Float(1.0)), mesh.vertex_attribute(key, "weight").unwrap());
        }

        mesh.update_default_vertex_attributes(attributes! { "weight" => 5.0 });
        assert_eq!(
            Some(Value::Float(5.0)),
            mesh.vertex_attribute(VertexKey::new(0), "weight").unwrap()
        );
        mesh.unset_vertex_attribute(VertexKey::new(3), "weight").unwrap();
        mesh.unset_vertex_attribute(VertexKey::new(3), "weight").unwrap();
        assert_eq!(
            Some(Value::Float(5.0)),
            mesh.vertex_attribute(VertexKey::new(3), "weight").unwrap()
        );
    }

    #[test]
    fn missing_vertex_attributes() {
        let mut mesh = grid();
        let missing = VertexKey::new(42);

        assert_eq!(Err(MeshError::VertexNotFound(missing)), mesh.vertex_attribute(missing, "x"));
        assert_eq!(
            Err(MeshError::VertexNotFound(missing)),
            mesh.set_vertex_attribute(missing, "x", 1.0)
        );
        assert_eq!(Ok(None), mesh.vertex_attribute(VertexKey::new(0), "missing"));

        // Plural writes are applied to all vertices or none.
        let keys = [VertexKey::new(0), missing];
        let result = mesh.set_vertices_attribute("fixed", true, Some(keys.as_slice()));
        assert_eq!(Err(MeshError::VertexNotFound(missing)), result);
        assert_eq!(Ok(None), mesh.vertex_attribute(VertexKey::new(0), "fixed"));
    }

    #[test]
    fn plural_attributes_preserve_order() {
        let mut mesh = triangulated_square();
        mesh.set_vertex_attributes(
            VertexKey::new(1),
            &["z", "label"],
            vec![Value::from(2.0), Value::from("b")],
        )
            .unwrap();

        assert_eq!(
            vec![Some(Value::from("b")), Some(Value::Float(1.0)), Some(Value::Float(2.0))],
            mesh.vertex_attributes_by(VertexKey::new(1), &["label", "x", "z"]).unwrap()
        );
        assert_eq!(
            vec![Some(Value::Float(1.0)), Some(Value::Float(0.0))],
            mesh.vertices_attribute("x", Some(keys(&[2, 3]).as_slice())).unwrap()
        );
        assert_eq!(4, mesh.vertices_attribute("x", None).unwrap().len());
        assert_eq!(
            vec![vec![Some(Value::Float(0.0)), Some(Value::Float(1.0))]],
            mesh.vertices_attributes(&["x", "y"], Some(keys(&[3]).as_slice())).unwrap()
        );

        let attributes = mesh.vertex_attributes(VertexKey::new(1)).unwrap();
        assert_eq!(
            vec!["label", "x", "y", "z"],
            attributes.names().collect::<Vec<_>>()
        );

        mesh.set_vertices_attribute("fixed", true, None).unwrap();
        assert_eq!(4, mesh.vertices_where(&attributes! { "fixed" => true }).len());
        assert_eq!(
            keys(&[1, 2]),
            mesh.vertices_where(&attributes! { "x" => 1.0 })
        );
    }

    #[test]
    fn attribute_views() {
        let mut mesh = triangulated_square();
        {
            let mut data = mesh.vertex_data_mut(VertexKey::new(0)).unwrap();
            data.set("weight", Value::Int(3));
            assert_eq!(Some(&Value::Float(0.0)), data.get("x"));
        }
        let data = mesh.vertex_data(VertexKey::new(0)).unwrap();
        assert_eq!(Some(&Value::Int(3)), data.get("weight"));
        assert_eq!(vec!["weight", "x", "y", "z"], data.names());
    }
}
