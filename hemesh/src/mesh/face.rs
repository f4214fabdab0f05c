use ahash::AHashMap;

use crate::attribute::{AttributeView, AttributeViewMut, Attributes, Layered, LayeredMut, Value};
use crate::key::{FaceKey, VertexKey};
use crate::mesh::{matches_conditions, unique_in_order, Mesh, MeshError, Side};
use crate::IteratorExt as _;

impl Mesh {
    /// Gets the cycle of vertices of a face.
    pub fn face_vertices(&self, key: FaceKey) -> Result<&[VertexKey], MeshError> {
        self.face_entry(key).map(|face| face.vertices.as_slice())
    }

    /// Gets the half-edges of a face in the order of its cycle.
    pub fn face_halfedges(&self, key: FaceKey) -> Result<Vec<(VertexKey, VertexKey)>, MeshError> {
        self.face_vertices(key)
            .map(|vertices| vertices.iter().copied().perimeter().collect())
    }

    /// Gets the vertex `n` positions before `vertex` in the cycle of a face.
    pub fn face_vertex_ancestor(
        &self,
        face: FaceKey,
        vertex: VertexKey,
        n: usize,
    ) -> Result<VertexKey, MeshError> {
        let (vertices, index) = self.face_vertex_index(face, vertex)?;
        let len = vertices.len();
        Ok(vertices[(index + len - n % len) % len])
    }

    /// Gets the vertex `n` positions after `vertex` in the cycle of a face.
    pub fn face_vertex_descendant(
        &self,
        face: FaceKey,
        vertex: VertexKey,
        n: usize,
    ) -> Result<VertexKey, MeshError> {
        let (vertices, index) = self.face_vertex_index(face, vertex)?;
        Ok(vertices[(index + n) % vertices.len()])
    }

    /// Gets the faces that share an edge with a face.
    pub fn face_neighbors(&self, key: FaceKey) -> Result<Vec<FaceKey>, MeshError> {
        let vertices = self.face_vertices(key)?;
        Ok(unique_in_order(
            vertices
                .iter()
                .copied()
                .perimeter()
                .filter_map(|(u, v)| self.halfedge(v, u).and_then(Side::face)),
        ))
    }

    /// Gets the number of neighbors of a face.
    pub fn face_degree(&self, key: FaceKey) -> Result<usize, MeshError> {
        self.face_neighbors(key).map(|neighbors| neighbors.len())
    }

    pub fn face_min_degree(&self) -> usize {
        self.face_degree_range().0
    }

    pub fn face_max_degree(&self) -> usize {
        self.face_degree_range().1
    }

    /// Maps every face to its neighbors.
    pub fn face_adjacency(&self) -> AHashMap<FaceKey, Vec<FaceKey>> {
        self.faces()
            .map(|key| (key, self.face_neighbors(key).unwrap_or_default()))
            .collect()
    }

    /// Gets the half-edge of `a` whose opposite half-edge belongs to `b`.
    pub fn face_adjacency_halfedge(
        &self,
        a: FaceKey,
        b: FaceKey,
    ) -> Result<Option<(VertexKey, VertexKey)>, MeshError> {
        self.face_entry(b)?;
        Ok(self
            .face_halfedges(a)?
            .into_iter()
            .find(|&(u, v)| self.halfedge(v, u) == Some(Side::Face(b))))
    }

    /// Gets the vertices shared by two faces, in the order of the cycle of
    /// `a`.
    pub fn face_adjacency_vertices(
        &self,
        a: FaceKey,
        b: FaceKey,
    ) -> Result<Vec<VertexKey>, MeshError> {
        let others = self.face_vertices(b)?;
        Ok(self
            .face_vertices(a)?
            .iter()
            .copied()
            .filter(|vertex| others.contains(vertex))
            .collect())
    }

    /// Returns `true` if any edge of the face is on the boundary.
    pub fn is_face_on_boundary(&self, key: FaceKey) -> Result<bool, MeshError> {
        Ok(self
            .face_halfedges(key)?
            .into_iter()
            .any(|(u, v)| self.halfedge(v, u).map_or(true, Side::is_boundary)))
    }

    pub fn face_data(&self, key: FaceKey) -> Result<Layered<'_>, MeshError> {
        let face = self.face_entry(key)?;
        Ok(Layered::new(&self.dfa, Some(&face.attributes)))
    }

    pub fn face_data_mut(&mut self, key: FaceKey) -> Result<LayeredMut<'_>, MeshError> {
        let face = self.face.get_mut(&key).ok_or(MeshError::FaceNotFound(key))?;
        Ok(LayeredMut::new(&self.dfa, &mut face.attributes))
    }

    pub fn face_attribute(&self, key: FaceKey, name: &str) -> Result<Option<Value>, MeshError> {
        Ok(self.face_data(key)?.get(name).cloned())
    }

    pub fn set_face_attribute<T>(
        &mut self,
        key: FaceKey,
        name: &str,
        value: T,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        self.face_data_mut(key)?.set(name, value.into());
        Ok(())
    }

    pub fn unset_face_attribute(&mut self, key: FaceKey, name: &str) -> Result<(), MeshError> {
        self.face_data_mut(key)?.unset(name);
        Ok(())
    }

    pub fn face_attributes(&self, key: FaceKey) -> Result<Attributes, MeshError> {
        self.face_data(key).map(|data| data.to_attributes())
    }

    pub fn face_attributes_by(
        &self,
        key: FaceKey,
        names: &[&str],
    ) -> Result<Vec<Option<Value>>, MeshError> {
        let data = self.face_data(key)?;
        Ok(names.iter().map(|name| data.get(name).cloned()).collect())
    }

    pub fn set_face_attributes<I>(
        &mut self,
        key: FaceKey,
        names: &[&str],
        values: I,
    ) -> Result<(), MeshError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut data = self.face_data_mut(key)?;
        for (name, value) in names.iter().zip(values) {
            data.set(name, value.into());
        }
        Ok(())
    }

    /// Gets the effective value of an attribute for many faces.
    ///
    /// If `keys` is `None`, all faces are queried in insertion order.
    pub fn faces_attribute(
        &self,
        name: &str,
        keys: Option<&[FaceKey]>,
    ) -> Result<Vec<Option<Value>>, MeshError> {
        self.select_faces(keys)?
            .into_iter()
            .map(|key| self.face_attribute(key, name))
            .collect()
    }

    pub fn faces_attributes(
        &self,
        names: &[&str],
        keys: Option<&[FaceKey]>,
    ) -> Result<Vec<Vec<Option<Value>>>, MeshError> {
        self.select_faces(keys)?
            .into_iter()
            .map(|key| self.face_attributes_by(key, names))
            .collect()
    }

    /// Writes an explicit value of an attribute for many faces.
    ///
    /// If any of the faces does not exist, no values are written.
    pub fn set_faces_attribute<T>(
        &mut self,
        name: &str,
        value: T,
        keys: Option<&[FaceKey]>,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        let value = value.into();
        for key in self.select_faces(keys)? {
            self.set_face_attribute(key, name, value.clone())?;
        }
        Ok(())
    }

    pub fn faces_where(&self, conditions: &Attributes) -> Vec<FaceKey> {
        self.faces()
            .filter(|key| {
                self.face_data(*key)
                    .map_or(false, |data| matches_conditions(conditions, |name| data.get(name)))
            })
            .collect()
    }

    fn select_faces(&self, keys: Option<&[FaceKey]>) -> Result<Vec<FaceKey>, MeshError> {
        match keys {
            Some(keys) => {
                if let Some(key) = keys.iter().find(|key| !self.has_face(**key)) {
                    return Err(MeshError::FaceNotFound(*key));
                }
                Ok(keys.to_vec())
            }
            None => Ok(self.faces().collect()),
        }
    }

    fn face_vertex_index(
        &self,
        face: FaceKey,
        vertex: VertexKey,
    ) -> Result<(&[VertexKey], usize), MeshError> {
        let vertices = self.face_vertices(face)?;
        vertices
            .iter()
            .position(|key| *key == vertex)
            .map(|index| (vertices, index))
            .ok_or(MeshError::VertexNotInFace { vertex, face })
    }

    fn face_degree_range(&self) -> (usize, usize) {
        Mesh::degree_range(self.faces().filter_map(|key| self.face_degree(key).ok()))
    }
}
