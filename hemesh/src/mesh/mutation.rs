use ahash::AHashMap;
use itertools::Itertools;
use log::{debug, trace};
use nalgebra::Point3;

use crate::attribute::Attributes;
use crate::key::{EdgeKey, FaceKey, VertexKey};
use crate::mesh::{unique_in_order, Cycle, Face, Mesh, MeshError, Side};
use crate::storage::Adjacency;
use crate::IteratorExt as _;

impl Mesh {
    /// Adds a vertex to the mesh.
    ///
    /// If `key` is `None`, a new key is allocated. If `key` names an existing
    /// vertex, the given attributes are written into that vertex and its other
    /// attributes are kept. Explicit keys advance key allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hemesh::{attributes, Mesh, VertexKey};
    ///
    /// let mut mesh = Mesh::new();
    /// let a = mesh.add_vertex(Some(VertexKey::new(7)), attributes! { "x" => 1.0 });
    /// let b = mesh.add_vertex(None, attributes! {});
    /// assert_eq!(VertexKey::new(8), b);
    /// ```
    pub fn add_vertex(&mut self, key: Option<VertexKey>, attributes: Attributes) -> VertexKey {
        let key = match key {
            Some(key) => {
                self.vertex_keys.observe(key.into_inner());
                key
            }
            None => VertexKey::new(self.vertex_keys.allocate()),
        };
        self.halfedge.entry(key).or_insert_with(Adjacency::new);
        match self.vertex.get_mut(&key) {
            Some(existing) => existing.merge(attributes),
            None => {
                self.vertex.insert(key, attributes);
            }
        }
        key
    }

    /// Adds a face with the given cycle of vertices.
    ///
    /// A trailing vertex that repeats the first vertex is ignored, as are
    /// consecutive repetitions of a vertex. If fewer than three distinct
    /// vertices remain, no face is added and `Ok(None)` is returned.
    ///
    /// For every half-edge $(u,v)$ of the cycle, the half-edge is assigned to
    /// the new face and the opposite half-edge $(v,u)$ is created as a
    /// boundary half-edge if it does not yet exist.
    ///
    /// If `key` names an existing face, that face is replaced. Edges shared by
    /// the old and new cycles keep their attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if any vertex of the cycle does not exist. In that
    /// case the mesh is not modified.
    pub fn add_face<I>(
        &mut self,
        vertices: I,
        key: Option<FaceKey>,
        attributes: Attributes,
    ) -> Result<Option<FaceKey>, MeshError>
    where
        I: IntoIterator<Item = VertexKey>,
    {
        let mut cycle = vertices.into_iter().collect::<Cycle>();
        if cycle.len() > 1 && cycle.first() == cycle.last() {
            cycle.pop();
        }
        let cycle = cycle
            .iter()
            .copied()
            .perimeter()
            .filter(|(u, v)| u != v)
            .map(|(u, _)| u)
            .collect::<Cycle>();
        if cycle.iter().unique().count() < 3 {
            debug!("ignoring degenerate face with cycle {:?}", cycle.as_slice());
            return Ok(None);
        }
        if let Some(vertex) = cycle.iter().find(|vertex| !self.vertex.contains_key(vertex)) {
            return Err(MeshError::VertexNotFound(*vertex));
        }
        let (key, replaced) = match key {
            Some(key) => {
                let replaced = self.face.remove(&key);
                if let Some(face) = replaced.as_ref() {
                    debug!("replacing face {}", key);
                    for (u, v) in face.vertices.iter().copied().perimeter() {
                        self.release_halfedge(u, v, key);
                    }
                }
                self.face_keys.observe(key.into_inner());
                (key, replaced)
            }
            None => (FaceKey::new(self.face_keys.allocate()), None),
        };
        for (u, v) in cycle.iter().copied().perimeter() {
            self.halfedge
                .entry(u)
                .or_insert_with(Adjacency::new)
                .insert(v, Side::Face(key));
            self.halfedge
                .entry(v)
                .or_insert_with(Adjacency::new)
                .insert_if_absent(u, Side::Boundary);
        }
        self.face.insert(
            key,
            Face {
                vertices: cycle,
                attributes,
            },
        );
        // Edges of the replaced face that the new face does not reuse.
        if let Some(face) = replaced {
            for (u, v) in face.vertices.iter().copied().perimeter() {
                self.remove_edge_if_unused(u, v);
            }
        }
        Ok(Some(key))
    }

    /// Deletes a face.
    ///
    /// Half-edges of the face become boundary half-edges. Edges that no longer
    /// have a face on either side are removed along with their attributes.
    pub fn delete_face(&mut self, key: FaceKey) -> Result<(), MeshError> {
        let face = self.face.remove(&key).ok_or(MeshError::FaceNotFound(key))?;
        for (u, v) in face.vertices.iter().copied().perimeter() {
            self.release_halfedge(u, v, key);
        }
        for (u, v) in face.vertices.iter().copied().perimeter() {
            self.remove_edge_if_unused(u, v);
        }
        Ok(())
    }

    /// Deletes a vertex along with all faces and edges incident to it.
    ///
    /// Edges of the deleted faces that are left without a face on either side
    /// are removed as well. Vertices may be left unconnected; see
    /// [`Mesh::cull_vertices`].
    pub fn delete_vertex(&mut self, key: VertexKey) -> Result<(), MeshError> {
        let neighbors = self.outgoing(key)?.keys().collect::<Vec<_>>();
        let faces = unique_in_order(neighbors.iter().flat_map(|&neighbor| {
            self.halfedge(key, neighbor)
                .and_then(Side::face)
                .into_iter()
                .chain(self.halfedge(neighbor, key).and_then(Side::face))
        }));
        let mut removed = Vec::with_capacity(faces.len());
        for face in faces {
            if let Some(record) = self.face.remove(&face) {
                trace!("deleting face {} incident to vertex {}", face, key);
                for (u, v) in record.vertices.iter().copied().perimeter() {
                    self.release_halfedge(u, v, face);
                }
                removed.push(record);
            }
        }
        for &neighbor in &neighbors {
            if let Some(adjacency) = self.halfedge.get_mut(&neighbor) {
                adjacency.remove(&key);
            }
            self.edgedata.remove(&EdgeKey::new(key, neighbor));
        }
        for record in &removed {
            for (u, v) in record.vertices.iter().copied().perimeter() {
                if u != key && v != key {
                    self.remove_edge_if_unused(u, v);
                }
            }
        }
        self.halfedge.remove(&key);
        self.vertex.remove(&key);
        trace!("deleted vertex {} with {} neighbors", key, neighbors.len());
        Ok(())
    }

    /// Removes vertices that are not connected to any other vertex.
    ///
    /// Returns the keys of the removed vertices.
    pub fn cull_vertices(&mut self) -> Vec<VertexKey> {
        let culled = self
            .vertices()
            .filter(|key| self.halfedge.get(key).map_or(true, Adjacency::is_empty))
            .collect::<Vec<_>>();
        for key in &culled {
            self.halfedge.remove(key);
            self.vertex.remove(key);
        }
        if !culled.is_empty() {
            debug!("culled {} unconnected vertices", culled.len());
        }
        culled
    }

    /// Replaces a face with a fan of triangles around a new vertex.
    ///
    /// The new vertex is placed at `position` or, if `None`, at the centroid
    /// of the face. If `key` names an existing vertex, that vertex is used as
    /// the apex of the fan and keeps its position unless one is given.
    ///
    /// Returns the key of the apex and the keys of the new faces. The
    /// attributes of the replaced face are discarded.
    pub fn insert_vertex(
        &mut self,
        face: FaceKey,
        key: Option<VertexKey>,
        position: Option<Point3<f64>>,
    ) -> Result<(VertexKey, Vec<FaceKey>), MeshError> {
        let cycle = self.face_entry(face)?.vertices.clone();
        let position = match position {
            Some(position) => Some(position),
            None if key.map_or(false, |key| self.has_vertex(key)) => None,
            None => Some(self.face_centroid(face)?),
        };
        let attributes = position
            .map(|position| {
                crate::attributes! { "x" => position.x, "y" => position.y, "z" => position.z }
            })
            .unwrap_or_default();
        let apex = self.add_vertex(key, attributes);
        self.face.remove(&face);
        let mut faces = Vec::with_capacity(cycle.len());
        for (u, v) in cycle.iter().copied().perimeter() {
            if let Some(key) = self.add_face(vec![u, v, apex], None, Attributes::new())? {
                faces.push(key);
            }
        }
        // A fan triangle degenerates when the apex is a corner of the face.
        // Half-edges that were not taken over by the fan are released.
        for (u, v) in cycle.iter().copied().perimeter() {
            self.release_halfedge(u, v, face);
        }
        for (u, v) in cycle.iter().copied().perimeter() {
            self.remove_edge_if_unused(u, v);
        }
        Ok((apex, faces))
    }

    /// Adds the vertices and faces of another mesh to this mesh.
    ///
    /// Vertices and faces of `other` are assigned new keys. Default attributes
    /// of `other` are written into the defaults of this mesh. Edge attributes
    /// are carried over.
    ///
    /// Returns a map from the vertex keys of `other` to the keys of the
    /// corresponding vertices in this mesh.
    pub fn join(&mut self, other: &Mesh) -> Result<AHashMap<VertexKey, VertexKey>, MeshError> {
        if let Some(vertex) = other
            .face
            .values()
            .flat_map(|face| face.vertices.iter())
            .find(|vertex| !other.vertex.contains_key(vertex))
        {
            return Err(MeshError::VertexNotFound(*vertex));
        }
        self.dva.merge(other.dva.clone());
        self.dea.merge(other.dea.clone());
        self.dfa.merge(other.dfa.clone());
        let mut keys = AHashMap::with_capacity(other.number_of_vertices());
        for (key, attributes) in other.vertex.iter() {
            keys.insert(key, self.add_vertex(None, attributes.clone()));
        }
        for face in other.face.values() {
            let cycle = face
                .vertices
                .iter()
                .filter_map(|vertex| keys.get(vertex).copied())
                .collect::<Cycle>();
            self.add_face(cycle, None, face.attributes.clone())?;
        }
        for (edge, attributes) in other.edgedata.iter() {
            let (u, v) = edge.vertices();
            if let (Some(&u), Some(&v)) = (keys.get(&u), keys.get(&v)) {
                if self.has_edge(u, v) {
                    self.edgedata.insert(EdgeKey::new(u, v), attributes.clone());
                }
            }
        }
        Ok(keys)
    }

    /// Reverses the cycle of every face, flipping the orientation of the mesh.
    pub fn flip_cycles(&mut self) {
        for adjacency in self.halfedge.values_mut() {
            *adjacency = Adjacency::new();
        }
        for key in self.vertex.keys() {
            self.halfedge.entry(key).or_insert_with(Adjacency::new);
        }
        for (key, face) in self.face.iter_mut() {
            face.vertices.reverse();
            for (u, v) in face.vertices.iter().copied().perimeter() {
                self.halfedge
                    .entry(u)
                    .or_insert_with(Adjacency::new)
                    .insert(v, Side::Face(key));
                self.halfedge
                    .entry(v)
                    .or_insert_with(Adjacency::new)
                    .insert_if_absent(u, Side::Boundary);
            }
        }
    }

    // Turns the half-edge into a boundary half-edge if it refers to the face.
    fn release_halfedge(&mut self, u: VertexKey, v: VertexKey, face: FaceKey) {
        if let Some(adjacency) = self.halfedge.get_mut(&u) {
            if adjacency.get(&v) == Some(Side::Face(face)) {
                adjacency.insert(v, Side::Boundary);
            }
        }
    }

    // Removes an edge if neither of its half-edges refers to a face.
    fn remove_edge_if_unused(&mut self, u: VertexKey, v: VertexKey) {
        let is_unused = |side: Option<Side>| side.map_or(true, Side::is_boundary);
        if is_unused(self.halfedge(u, v)) && is_unused(self.halfedge(v, u)) {
            for (a, b) in [(u, v), (v, u)] {
                if let Some(adjacency) = self.halfedge.get_mut(&a) {
                    adjacency.remove(&b);
                }
            }
            self.edgedata.remove(&EdgeKey::new(u, v));
        }
    }
}
