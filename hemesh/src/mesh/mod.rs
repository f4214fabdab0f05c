//! Half-edge representation of polygonal meshes.
//!
//! A [`Mesh`] is composed of _vertices_, _faces_, and _half-edges_. Vertices
//! and faces are stored entities identified by [`VertexKey`]s and
//! [`FaceKey`]s. Half-edges are not stored entities: they are a directed
//! relation between pairs of vertices that refers to the face on one side of
//! the undirected edge between them.
//!
//! # Representation
//!
//! A face is an ordered cycle of at least three vertices. For each consecutive
//! pair $(u,v)$ in that cycle, the half-edge $\overrightarrow{uv}$ refers to
//! the face. The opposite half-edge $\overrightarrow{vu}$ always exists; if no
//! face uses it, it refers to the [boundary][`Side::Boundary`]. An edge exists
//! as soon as either of its half-edges exists, and at least one of its two
//! half-edges always refers to a face.
//!
//! Keys are allocated monotonically and are never reused. Callers may choose
//! keys explicitly; allocation always continues past the greatest key observed
//! so far.
//!
//! # Consistency
//!
//! Mutations (`add_face`, `delete_vertex`, etc.) keep vertices, faces, and
//! half-edges consistent with each other and either apply completely or not at
//! all. They do not validate the global consistency of a mesh. Violations of
//! the invariants above can be detected with [`Mesh::is_valid`].

mod data;
mod edge;
mod face;
mod geometry;
mod mutation;
mod topology;
mod vertex;

use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use num::ToPrimitive;
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use crate::attribute::{Attributes, Value};
use crate::key::{FaceKey, KeyCounter, VertexKey};
use crate::storage::{Adjacency, EntityMap};

pub use crate::mesh::data::{MeshData, SCHEMA_VERSION};

/// Upper bound on the number of steps taken by walks around a vertex.
///
/// Walks are bounded so that corrupt topology cannot cause an endless loop.
pub const WALK_LIMIT: usize = 1000;

pub(crate) type Cycle = SmallVec<[VertexKey; 4]>;

/// Errors concerning [`Mesh`]es.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("vertex {0} not found")]
    VertexNotFound(VertexKey),
    #[error("face {0} not found")]
    FaceNotFound(FaceKey),
    #[error("edge ({0}, {1}) not found")]
    EdgeNotFound(VertexKey, VertexKey),
    #[error("vertex {vertex} not found in face {face}")]
    VertexNotInFace { vertex: VertexKey, face: FaceKey },
    #[error("vertex index {0} out of bounds")]
    IndexNotFound(i64),
    /// Coordinates are not numeric or the geometry is degenerate.
    #[error("geometric operation failed")]
    Geometry,
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("encoding operation failed: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for MeshError {
    fn from(error: serde_json::Error) -> Self {
        MeshError::Encoding(error.to_string())
    }
}

/// Target of a half-edge.
///
/// A half-edge either refers to the face on its side of an edge or to the
/// boundary of the mesh.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    Boundary,
    Face(FaceKey),
}

impl Side {
    pub fn is_boundary(self) -> bool {
        matches!(self, Side::Boundary)
    }

    pub fn face(self) -> Option<FaceKey> {
        match self {
            Side::Face(face) => Some(face),
            Side::Boundary => None,
        }
    }
}

impl From<Option<FaceKey>> for Side {
    fn from(face: Option<FaceKey>) -> Self {
        face.map_or(Side::Boundary, Side::Face)
    }
}

impl From<Side> for Option<FaceKey> {
    fn from(side: Side) -> Self {
        side.face()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Face {
    pub vertices: Cycle,
    pub attributes: Attributes,
}

/// Half-edge representation of a polygonal mesh.
///
/// See the [`mesh`][`crate::mesh`] module documentation.
#[derive(Clone, Debug)]
pub struct Mesh {
    attributes: Attributes,
    dva: Attributes,
    dea: Attributes,
    dfa: Attributes,
    vertex: EntityMap<VertexKey, Attributes>,
    face: EntityMap<FaceKey, Face>,
    halfedge: AHashMap<VertexKey, Adjacency<VertexKey, Side>>,
    edgedata: AHashMap<crate::key::EdgeKey, Attributes>,
    vertex_keys: KeyCounter,
    face_keys: KeyCounter,
}

impl Mesh {
    /// Creates an empty `Mesh`.
    ///
    /// Vertices default to the coordinates $(0,0,0)$.
    pub fn new() -> Self {
        Mesh::with_defaults(
            crate::attributes! { "x" => 0.0, "y" => 0.0, "z" => 0.0 },
            Attributes::new(),
            Attributes::new(),
        )
    }

    /// Creates an empty `Mesh` with the given default vertex, edge, and face
    /// attributes.
    pub fn with_defaults(dva: Attributes, dea: Attributes, dfa: Attributes) -> Self {
        Mesh {
            attributes: crate::attributes! { "name" => "Mesh" },
            dva,
            dea,
            dfa,
            vertex: EntityMap::new(),
            face: EntityMap::new(),
            halfedge: AHashMap::new(),
            edgedata: AHashMap::new(),
            vertex_keys: KeyCounter::default(),
            face_keys: KeyCounter::default(),
        }
    }

    /// Creates a mesh from positions and faces given as lists of indices into
    /// those positions.
    ///
    /// Vertices are inserted in order, so the key of each vertex of a new mesh
    /// equals its index. Faces with fewer than three distinct vertices are
    /// skipped (see [`Mesh::add_face`]).
    ///
    /// # Errors
    ///
    /// Returns an error if an index is out of bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hemesh::Mesh;
    ///
    /// let mesh = Mesh::from_vertices_and_faces(
    ///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    ///     vec![[0u32, 1, 2]],
    /// )
    /// .unwrap();
    /// assert_eq!(3, mesh.number_of_edges());
    /// ```
    pub fn from_vertices_and_faces<I, P, J, F, N>(vertices: I, faces: J) -> Result<Self, MeshError>
    where
        I: IntoIterator<Item = P>,
        P: Into<[f64; 3]>,
        J: IntoIterator<Item = F>,
        F: IntoIterator<Item = N>,
        N: ToPrimitive,
    {
        let mut mesh = Mesh::new();
        let keys = vertices
            .into_iter()
            .map(|position| mesh.add_vertex(None, position_attributes(position.into())))
            .collect::<Vec<_>>();
        for face in faces {
            let cycle = face
                .into_iter()
                .map(|index| {
                    let index = index.to_i64().unwrap_or(-1);
                    usize::try_from(index)
                        .ok()
                        .and_then(|index| keys.get(index).copied())
                        .ok_or(MeshError::IndexNotFound(index))
                })
                .collect::<Result<Cycle, _>>()?;
            mesh.add_face(cycle, None, Attributes::new())?;
        }
        Ok(mesh)
    }

    /// Creates a mesh from keyed positions and keyed faces.
    ///
    /// The given keys are used as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if a face refers to a vertex that is not given.
    pub fn from_keyed_vertices_and_faces<I, P, J, F>(
        vertices: I,
        faces: J,
    ) -> Result<Self, MeshError>
    where
        I: IntoIterator<Item = (VertexKey, P)>,
        P: Into<[f64; 3]>,
        J: IntoIterator<Item = (FaceKey, F)>,
        F: IntoIterator<Item = VertexKey>,
    {
        let mut mesh = Mesh::new();
        for (key, position) in vertices {
            mesh.add_vertex(Some(key), position_attributes(position.into()));
        }
        for (key, face) in faces {
            mesh.add_face(face, Some(key), Attributes::new())?;
        }
        Ok(mesh)
    }

    /// Creates a mesh from polygons given by the positions of their corners.
    ///
    /// Corners that coincide after rounding to `precision` decimal places are
    /// welded into a single vertex.
    pub fn from_polygons<I, F, P>(polygons: I, precision: u32) -> Result<Self, MeshError>
    where
        I: IntoIterator<Item = F>,
        F: IntoIterator<Item = P>,
        P: Into<[f64; 3]>,
    {
        let scale = 10f64.powi(precision.min(15) as i32);
        let mut mesh = Mesh::new();
        let mut welds = AHashMap::<[i64; 3], VertexKey>::new();
        for polygon in polygons {
            let cycle = polygon
                .into_iter()
                .map(|position| {
                    let position = position.into();
                    let weld = position.map(|x| (x * scale).round() as i64);
                    *welds
                        .entry(weld)
                        .or_insert_with(|| mesh.add_vertex(None, position_attributes(position)))
                })
                .collect::<Cycle>();
            mesh.add_face(cycle, None, Attributes::new())?;
        }
        Ok(mesh)
    }

    /// Gets the positions of all vertices and the faces of the mesh as lists
    /// of indices into those positions.
    ///
    /// Positions are in vertex insertion order (see [`Mesh::key_index`]).
    pub fn to_vertices_and_faces(&self) -> Result<(Vec<[f64; 3]>, Vec<Vec<usize>>), MeshError> {
        let indices = self.key_index();
        let vertices = self
            .vertices()
            .map(|key| {
                self.vertex_coordinates(key)
                    .map(|position| [position.x, position.y, position.z])
            })
            .collect::<Result<Vec<[f64; 3]>, _>>()?;
        let faces = self
            .face
            .values()
            .map(|face| {
                face.vertices
                    .iter()
                    .map(|key| indices.get(key).copied().ok_or(MeshError::VertexNotFound(*key)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((vertices, faces))
    }

    /// Maps vertex keys to their index in vertex insertion order.
    pub fn key_index(&self) -> AHashMap<VertexKey, usize> {
        self.vertices()
            .enumerate()
            .map(|(index, key)| (key, index))
            .collect()
    }

    /// Gets vertex keys in insertion order, so that the key of a vertex with
    /// index `i` is at position `i`.
    pub fn index_key(&self) -> Vec<VertexKey> {
        self.vertices().collect()
    }

    pub fn name(&self) -> &str {
        self.attributes
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Mesh")
    }

    pub fn set_name<S>(&mut self, name: S)
    where
        S: Into<String>,
    {
        self.attributes.insert("name", name.into());
    }

    /// Gets the attributes of the mesh itself.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn default_vertex_attributes(&self) -> &Attributes {
        &self.dva
    }

    pub fn default_edge_attributes(&self) -> &Attributes {
        &self.dea
    }

    pub fn default_face_attributes(&self) -> &Attributes {
        &self.dfa
    }

    /// Writes default vertex attributes.
    ///
    /// Every vertex without an explicit value for an updated attribute reports
    /// the new default.
    pub fn update_default_vertex_attributes(&mut self, attributes: Attributes) {
        self.dva.merge(attributes);
    }

    pub fn update_default_edge_attributes(&mut self, attributes: Attributes) {
        self.dea.merge(attributes);
    }

    pub fn update_default_face_attributes(&mut self, attributes: Attributes) {
        self.dfa.merge(attributes);
    }

    pub fn number_of_vertices(&self) -> usize {
        self.vertex.len()
    }

    pub fn number_of_faces(&self) -> usize {
        self.face.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges().count()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex.is_empty()
    }

    pub fn has_vertex(&self, key: VertexKey) -> bool {
        self.vertex.contains_key(&key)
    }

    pub fn has_face(&self, key: FaceKey) -> bool {
        self.face.contains_key(&key)
    }

    /// Gets an iterator over the keys of all vertices in insertion order.
    pub fn vertices(&self) -> impl '_ + Clone + Iterator<Item = VertexKey> {
        self.vertex.keys()
    }

    /// Gets an iterator over the keys of all faces in insertion order.
    pub fn faces(&self) -> impl '_ + Clone + Iterator<Item = FaceKey> {
        self.face.keys()
    }

    pub fn get_any_vertex(&self) -> Option<VertexKey> {
        self.vertices().next()
    }

    pub fn get_any_face(&self) -> Option<FaceKey> {
        self.faces().next()
    }

    /// Gets the greatest vertex key issued or observed so far.
    pub fn max_vertex_key(&self) -> Option<VertexKey> {
        self.vertex_keys.max().map(VertexKey::new)
    }

    /// Gets the greatest face key issued or observed so far.
    pub fn max_face_key(&self) -> Option<FaceKey> {
        self.face_keys.max().map(FaceKey::new)
    }

    pub(crate) fn outgoing(
        &self,
        key: VertexKey,
    ) -> Result<&Adjacency<VertexKey, Side>, MeshError> {
        if !self.vertex.contains_key(&key) {
            return Err(MeshError::VertexNotFound(key));
        }
        self.halfedge
            .get(&key)
            .ok_or(MeshError::VertexNotFound(key))
    }

    pub(crate) fn face_entry(&self, key: FaceKey) -> Result<&Face, MeshError> {
        self.face.get(&key).ok_or(MeshError::FaceNotFound(key))
    }

    fn degree_range<I>(degrees: I) -> (usize, usize)
    where
        I: IntoIterator<Item = usize>,
    {
        degrees
            .into_iter()
            .minmax()
            .into_option()
            .unwrap_or((0, 0))
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh::new()
    }
}

impl Display for Mesh {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let (vmin, vmax) = Mesh::degree_range(
            self.vertices()
                .filter_map(|key| self.halfedge.get(&key).map(Adjacency::len)),
        );
        let (fmin, fmax) = Mesh::degree_range(
            self.faces()
                .filter_map(|key| self.face_neighbors(key).ok().map(|neighbors| neighbors.len())),
        );
        writeln!(formatter, "{}", self.name())?;
        writeln!(formatter, "{}", "=".repeat(self.name().len()))?;
        writeln!(formatter, "- vertices: {}", self.number_of_vertices())?;
        writeln!(formatter, "- edges: {}", self.number_of_edges())?;
        writeln!(formatter, "- faces: {}", self.number_of_faces())?;
        writeln!(formatter, "- vertex degree: {}/{}", vmin, vmax)?;
        write!(formatter, "- face degree: {}/{}", fmin, fmax)
    }
}

fn position_attributes([x, y, z]: [f64; 3]) -> Attributes {
    crate::attributes! { "x" => x, "y" => y, "z" => z }
}

// Filters keys by attribute equality against the given conditions.
fn matches_conditions<'a, F>(conditions: &Attributes, mut get: F) -> bool
where
    F: FnMut(&str) -> Option<&'a Value>,
{
    conditions
        .iter()
        .all(|(name, expected)| get(name).map_or(false, |value| value == expected))
}

// Collects distinct keys, preserving the order of first occurrence.
fn unique_in_order<K, I>(keys: I) -> Vec<K>
where
    K: Copy + Eq + std::hash::Hash,
    I: IntoIterator<Item = K>,
{
    let mut seen = AHashSet::new();
    keys.into_iter().filter(|key| seen.insert(*key)).collect()
}
