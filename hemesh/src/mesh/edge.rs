use ahash::AHashSet;

use crate::attribute::{AttributeView, AttributeViewMut, Attributes, Layered, LayeredMut, Value};
use crate::key::{EdgeKey, FaceKey, VertexKey};
use crate::mesh::{matches_conditions, Mesh, MeshError, Side};

impl Mesh {
    /// Gets the side of the half-edge from `u` to `v`, if the half-edge
    /// exists.
    pub fn halfedge(&self, u: VertexKey, v: VertexKey) -> Option<Side> {
        self.halfedge
            .get(&u)
            .and_then(|outgoing| outgoing.get(&v))
    }

    pub fn has_halfedge(&self, u: VertexKey, v: VertexKey) -> bool {
        self.halfedge(u, v).is_some()
    }

    /// Returns `true` if either half-edge between `u` and `v` exists.
    pub fn has_edge(&self, u: VertexKey, v: VertexKey) -> bool {
        self.has_halfedge(u, v) || self.has_halfedge(v, u)
    }

    /// Gets an iterator over all half-edges.
    ///
    /// Half-edges are grouped by their source vertex in vertex insertion
    /// order.
    pub fn halfedges(&self) -> impl '_ + Iterator<Item = (VertexKey, VertexKey)> {
        self.vertices().flat_map(move |u| {
            self.halfedge
                .get(&u)
                .into_iter()
                .flat_map(move |outgoing| outgoing.keys().map(move |v| (u, v)))
        })
    }

    /// Gets an iterator over all edges.
    ///
    /// Each edge is yielded once, oriented like the first of its half-edges
    /// encountered by [`Mesh::halfedges`].
    pub fn edges(&self) -> impl '_ + Iterator<Item = (VertexKey, VertexKey)> {
        let mut seen = AHashSet::new();
        self.halfedges()
            .filter(move |&(u, v)| seen.insert(EdgeKey::new(u, v)))
    }

    /// Gets the face of the half-edge from `u` to `v`, or `None` if the
    /// half-edge is on the boundary.
    pub fn halfedge_face(&self, u: VertexKey, v: VertexKey) -> Result<Option<FaceKey>, MeshError> {
        self.halfedge(u, v)
            .map(Side::face)
            .ok_or(MeshError::EdgeNotFound(u, v))
    }

    /// Gets the half-edge that follows the half-edge from `u` to `v`.
    ///
    /// For a boundary half-edge, this is the next half-edge along the
    /// boundary.
    pub fn halfedge_after(
        &self,
        u: VertexKey,
        v: VertexKey,
    ) -> Result<(VertexKey, VertexKey), MeshError> {
        match self.halfedge_face(u, v)? {
            Some(face) => Ok((v, self.face_vertex_descendant(face, v, 1)?)),
            None => {
                let candidates = self
                    .outgoing(v)?
                    .iter()
                    .filter(|(_, side)| side.is_boundary())
                    .map(|(w, _)| w)
                    .collect::<Vec<_>>();
                candidates
                    .iter()
                    .copied()
                    .find(|w| *w != u)
                    .or_else(|| candidates.first().copied())
                    .map(|w| (v, w))
                    .ok_or(MeshError::EdgeNotFound(u, v))
            }
        }
    }

    /// Gets the half-edge that precedes the half-edge from `u` to `v`.
    ///
    /// For a boundary half-edge, this is the previous half-edge along the
    /// boundary.
    pub fn halfedge_before(
        &self,
        u: VertexKey,
        v: VertexKey,
    ) -> Result<(VertexKey, VertexKey), MeshError> {
        match self.halfedge_face(u, v)? {
            Some(face) => Ok((self.face_vertex_ancestor(face, u, 1)?, u)),
            None => self
                .outgoing(u)?
                .keys()
                .filter(|t| *t != v)
                .chain(Some(v))
                .find(|t| self.halfedge(*t, u) == Some(Side::Boundary))
                .map(|t| (t, u))
                .ok_or(MeshError::EdgeNotFound(u, v)),
        }
    }

    /// Gets the faces on both sides of an edge: the face of the half-edge from
    /// `u` to `v` and the face of the opposite half-edge.
    pub fn edge_faces(
        &self,
        u: VertexKey,
        v: VertexKey,
    ) -> Result<(Option<FaceKey>, Option<FaceKey>), MeshError> {
        if !self.has_edge(u, v) {
            return Err(MeshError::EdgeNotFound(u, v));
        }
        Ok((
            self.halfedge(u, v).and_then(Side::face),
            self.halfedge(v, u).and_then(Side::face),
        ))
    }

    /// Returns `true` if either half-edge of the edge is on the boundary.
    pub fn is_edge_on_boundary(&self, u: VertexKey, v: VertexKey) -> Result<bool, MeshError> {
        self.edge_faces(u, v)
            .map(|(a, b)| a.is_none() || b.is_none())
    }

    pub fn edge_data(&self, u: VertexKey, v: VertexKey) -> Result<Layered<'_>, MeshError> {
        if !self.has_edge(u, v) {
            return Err(MeshError::EdgeNotFound(u, v));
        }
        Ok(Layered::new(&self.dea, self.edgedata.get(&EdgeKey::new(u, v))))
    }

    pub fn edge_data_mut(
        &mut self,
        u: VertexKey,
        v: VertexKey,
    ) -> Result<LayeredMut<'_>, MeshError> {
        if !self.has_edge(u, v) {
            return Err(MeshError::EdgeNotFound(u, v));
        }
        let explicit = self.edgedata.entry(EdgeKey::new(u, v)).or_default();
        Ok(LayeredMut::new(&self.dea, explicit))
    }

    /// Gets the effective value of an edge attribute. Edge attributes are
    /// shared by both orientations of an edge.
    pub fn edge_attribute(
        &self,
        u: VertexKey,
        v: VertexKey,
        name: &str,
    ) -> Result<Option<Value>, MeshError> {
        Ok(self.edge_data(u, v)?.get(name).cloned())
    }

    pub fn set_edge_attribute<T>(
        &mut self,
        u: VertexKey,
        v: VertexKey,
        name: &str,
        value: T,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        self.edge_data_mut(u, v)?.set(name, value.into());
        Ok(())
    }

    pub fn unset_edge_attribute(
        &mut self,
        u: VertexKey,
        v: VertexKey,
        name: &str,
    ) -> Result<(), MeshError> {
        if !self.has_edge(u, v) {
            return Err(MeshError::EdgeNotFound(u, v));
        }
        if let Some(explicit) = self.edgedata.get_mut(&EdgeKey::new(u, v)) {
            explicit.remove(name);
        }
        Ok(())
    }

    pub fn edge_attributes(&self, u: VertexKey, v: VertexKey) -> Result<Attributes, MeshError> {
        self.edge_data(u, v).map(|data| data.to_attributes())
    }

    pub fn edge_attributes_by(
        &self,
        u: VertexKey,
        v: VertexKey,
        names: &[&str],
    ) -> Result<Vec<Option<Value>>, MeshError> {
        let data = self.edge_data(u, v)?;
        Ok(names.iter().map(|name| data.get(name).cloned()).collect())
    }

    pub fn set_edge_attributes<I>(
        &mut self,
        u: VertexKey,
        v: VertexKey,
        names: &[&str],
        values: I,
    ) -> Result<(), MeshError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut data = self.edge_data_mut(u, v)?;
        for (name, value) in names.iter().zip(values) {
            data.set(name, value.into());
        }
        Ok(())
    }

    /// Gets the effective value of an attribute for many edges.
    ///
    /// If `edges` is `None`, all edges are queried in the order of
    /// [`Mesh::edges`].
    pub fn edges_attribute(
        &self,
        name: &str,
        edges: Option<&[(VertexKey, VertexKey)]>,
    ) -> Result<Vec<Option<Value>>, MeshError> {
        self.select_edges(edges)?
            .into_iter()
            .map(|(u, v)| self.edge_attribute(u, v, name))
            .collect()
    }

    pub fn edges_attributes(
        &self,
        names: &[&str],
        edges: Option<&[(VertexKey, VertexKey)]>,
    ) -> Result<Vec<Vec<Option<Value>>>, MeshError> {
        self.select_edges(edges)?
            .into_iter()
            .map(|(u, v)| self.edge_attributes_by(u, v, names))
            .collect()
    }

    /// Writes an explicit value of an attribute for many edges.
    ///
    /// If any of the edges does not exist, no values are written.
    pub fn set_edges_attribute<T>(
        &mut self,
        name: &str,
        value: T,
        edges: Option<&[(VertexKey, VertexKey)]>,
    ) -> Result<(), MeshError>
    where
        T: Into<Value>,
    {
        let value = value.into();
        for (u, v) in self.select_edges(edges)? {
            self.set_edge_attribute(u, v, name, value.clone())?;
        }
        Ok(())
    }

    pub fn edges_where(&self, conditions: &Attributes) -> Vec<(VertexKey, VertexKey)> {
        self.edges()
            .filter(|&(u, v)| {
                self.edge_data(u, v)
                    .map_or(false, |data| matches_conditions(conditions, |name| data.get(name)))
            })
            .collect()
    }

    fn select_edges(
        &self,
        edges: Option<&[(VertexKey, VertexKey)]>,
    ) -> Result<Vec<(VertexKey, VertexKey)>, MeshError> {
        match edges {
            Some(edges) => {
                if let Some(&(u, v)) = edges.iter().find(|(u, v)| !self.has_edge(*u, *v)) {
                    return Err(MeshError::EdgeNotFound(u, v));
                }
                Ok(edges.to_vec())
            }
            None => Ok(self.edges().collect()),
        }
    }
}
