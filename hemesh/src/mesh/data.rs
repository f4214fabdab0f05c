//! Structural snapshots of meshes.

use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::attribute::Attributes;
use crate::key::{EdgeKey, FaceKey, KeyCounter, VertexKey};
use crate::mesh::{Mesh, MeshError};

/// Version of the structural snapshot written by [`Mesh::to_data`].
pub const SCHEMA_VERSION: u32 = 1;

/// Structural snapshot of a [`Mesh`].
///
/// Only explicit attributes are recorded; defaults are recorded once per
/// entity kind. The key counters are recorded explicitly so that keys issued
/// by a restored mesh never collide with keys of deleted entities.
///
/// In JSON, vertex and face keys are written as object keys (strings of
/// digits) and edge keys as strings of the form `"u-v"`. Both are decoded back
/// into integer keys.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MeshData {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default = "origin")]
    pub dva: Attributes,
    #[serde(default)]
    pub dea: Attributes,
    #[serde(default)]
    pub dfa: Attributes,
    pub vertex: BTreeMap<VertexKey, Attributes>,
    pub face: BTreeMap<FaceKey, Vec<VertexKey>>,
    #[serde(default)]
    pub facedata: BTreeMap<FaceKey, Attributes>,
    #[serde(default)]
    pub edgedata: BTreeMap<EdgeKey, Attributes>,
    #[serde(default = "unissued")]
    pub max_int_key: i64,
    #[serde(default = "unissued")]
    pub max_int_fkey: i64,
}

fn unissued() -> i64 {
    -1
}

fn origin() -> Attributes {
    crate::attributes! { "x" => 0.0, "y" => 0.0, "z" => 0.0 }
}

impl Mesh {
    /// Takes a structural snapshot of the mesh.
    pub fn to_data(&self) -> MeshData {
        MeshData {
            version: SCHEMA_VERSION,
            attributes: self.attributes.clone(),
            dva: self.dva.clone(),
            dea: self.dea.clone(),
            dfa: self.dfa.clone(),
            vertex: self
                .vertex
                .iter()
                .map(|(key, attributes)| (key, attributes.clone()))
                .collect(),
            face: self
                .face
                .iter()
                .map(|(key, face)| (key, face.vertices.to_vec()))
                .collect(),
            facedata: self
                .face
                .iter()
                .filter(|(_, face)| !face.attributes.is_empty())
                .map(|(key, face)| (key, face.attributes.clone()))
                .collect(),
            edgedata: self
                .edgedata
                .iter()
                .filter(|(edge, attributes)| {
                    let (u, v) = edge.vertices();
                    !attributes.is_empty() && self.has_edge(u, v)
                })
                .map(|(edge, attributes)| (*edge, attributes.clone()))
                .collect(),
            max_int_key: self.vertex_keys.to_persisted(),
            max_int_fkey: self.face_keys.to_persisted(),
        }
    }

    /// Restores a mesh from a structural snapshot.
    ///
    /// Vertices and faces are replayed through [`Mesh::add_vertex`] and
    /// [`Mesh::add_face`] in key order. Faces that refer to missing vertices
    /// and attributes of missing edges are skipped.
    ///
    /// In an invalid mesh where several faces claim the same half-edge, the
    /// face with the greatest key owns that half-edge after restoring,
    /// regardless of which face was added last.
    pub fn from_data(data: MeshData) -> Self {
        let MeshData {
            attributes,
            dva,
            dea,
            dfa,
            vertex,
            face,
            mut facedata,
            edgedata,
            max_int_key,
            max_int_fkey,
            ..
        } = data;
        let mut mesh = Mesh::with_defaults(dva, dea, dfa);
        mesh.attributes.merge(attributes);
        for (key, attributes) in vertex {
            mesh.add_vertex(Some(key), attributes);
        }
        for (key, vertices) in face {
            let attributes = facedata.remove(&key).unwrap_or_default();
            match mesh.add_face(vertices, Some(key), attributes) {
                Ok(Some(_)) => {}
                Ok(None) => debug!("skipping degenerate face {}", key),
                Err(error) => debug!("skipping face {}: {}", key, error),
            }
        }
        for (edge, attributes) in edgedata {
            let (u, v) = edge.vertices();
            if mesh.has_edge(u, v) {
                mesh.edgedata.insert(edge, attributes);
            }
            else {
                debug!("skipping attributes of missing edge {}", edge);
            }
        }
        mesh.vertex_keys.merge(KeyCounter::from_persisted(max_int_key));
        mesh.face_keys.merge(KeyCounter::from_persisted(max_int_fkey));
        mesh
    }

    /// Encodes the structural snapshot of the mesh as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if any attribute is a NaN or infinite float, which
    /// JSON cannot represent.
    pub fn to_json(&self) -> Result<String, MeshError> {
        serde_json::to_string(&self.to_data()).map_err(MeshError::from)
    }

    pub fn to_json_pretty(&self) -> Result<String, MeshError> {
        serde_json::to_string_pretty(&self.to_data()).map_err(MeshError::from)
    }

    /// Decodes a mesh from the JSON encoding of its structural snapshot.
    pub fn from_json(text: &str) -> Result<Self, MeshError> {
        serde_json::from_str::<MeshData>(text)
            .map(Mesh::from_data)
            .map_err(MeshError::from)
    }
}

impl From<MeshData> for Mesh {
    fn from(data: MeshData) -> Self {
        Mesh::from_data(data)
    }
}

impl<'a> From<&'a Mesh> for MeshData {
    fn from(mesh: &'a Mesh) -> Self {
        mesh.to_data()
    }
}

impl Serialize for Mesh {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_data().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Mesh {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        MeshData::deserialize(deserializer).map(Mesh::from_data)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::attribute::{Attributes, Value};
    use crate::attributes;
    use crate::key::{FaceKey, VertexKey};
    use crate::mesh::tests::{grid, keys, triangulated_square};
    use crate::mesh::{Mesh, MeshData, MeshError, Side, SCHEMA_VERSION};

    fn assert_same(expected: &Mesh, actual: &Mesh) {
        assert_eq!(expected.number_of_vertices(), actual.number_of_vertices());
        assert_eq!(expected.number_of_faces(), actual.number_of_faces());
        assert_eq!(expected.number_of_edges(), actual.number_of_edges());
        assert_eq!(expected.name(), actual.name());
        assert_eq!(expected.default_vertex_attributes(), actual.default_vertex_attributes());
        for key in expected.vertices() {
            assert_eq!(
                expected.vertex_attributes(key).unwrap(),
                actual.vertex_attributes(key).unwrap()
            );
            let mut neighbors = expected.vertex_neighbors(key, false).unwrap();
            let mut restored = actual.vertex_neighbors(key, false).unwrap();
            neighbors.sort();
            restored.sort();
            assert_eq!(neighbors, restored);
        }
        for key in expected.faces() {
            assert_eq!(expected.face_vertices(key).unwrap(), actual.face_vertices(key).unwrap());
            assert_eq!(
                expected.face_attributes(key).unwrap(),
                actual.face_attributes(key).unwrap()
            );
        }
        for (u, v) in expected.edges() {
            assert_eq!(
                expected.halfedge(u, v),
                actual.halfedge(u, v)
            );
            assert_eq!(
                expected.edge_attributes(u, v).unwrap(),
                actual.edge_attributes(u, v).unwrap()
            );
        }
    }

    #[test]
    fn json_round_trip() {
        let mut mesh = triangulated_square();
        mesh.set_name("square");
        mesh.update_default_edge_attributes(attributes! { "q" => 1.0 });
        mesh.set_vertex_attribute(VertexKey::new(1), "fixed", true).unwrap();
        mesh.set_face_attribute(FaceKey::new(1), "tags", vec!["a", "b"]).unwrap();
        mesh.set_edge_attribute(VertexKey::new(2), VertexKey::new(0), "q", 3)
            .unwrap();

        let text = mesh.to_json().unwrap();
        let decoded = Mesh::from_json(&text).unwrap();
        assert_same(&mesh, &decoded);
        assert_eq!(
            Some(Value::Int(3)),
            decoded
                .edge_attribute(VertexKey::new(0), VertexKey::new(2), "q")
                .unwrap()
        );

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(3, json["edgedata"]["0-2"]["q"]);
        assert_eq!(serde_json::json!([0, 2, 3]), json["face"]["1"]);
        assert_eq!(3, json["max_int_key"]);
        assert_eq!(1, json["max_int_fkey"]);
        assert_eq!("square", json["attributes"]["name"]);
        assert_eq!(SCHEMA_VERSION, json["version"].as_u64().unwrap() as u32);
    }

    #[test]
    fn counters_survive_deletion() {
        let mut mesh = grid();
        mesh.delete_vertex(VertexKey::new(15)).unwrap();
        mesh.delete_face(FaceKey::new(0)).unwrap();

        let mut decoded = Mesh::from_data(mesh.to_data());
        assert_same(&mesh, &decoded);
        assert_eq!(
            VertexKey::new(16),
            decoded.add_vertex(None, Attributes::new())
        );
        let face = decoded
            .add_face(keys(&[5, 6, 10]), None, Attributes::new())
            .unwrap();
        assert_eq!(Some(FaceKey::new(9)), face);
    }

    #[test]
    fn serde_through_snapshot() {
        let mesh = triangulated_square();
        let text = serde_json::to_string(&mesh).unwrap();
        let decoded: Mesh = serde_json::from_str(&text).unwrap();
        assert_same(&mesh, &decoded);
        assert_eq!(MeshData::from(&mesh), decoded.to_data());
    }

    #[test]
    fn inconsistent_records_are_skipped() {
        let text = r#"{
            "vertex": {"0": {"x": 0.0}, "1": {"x": 1.0}, "2": {"y": 1.0}},
            "face": {"0": [0, 1, 2], "4": [0, 1, 9], "5": [0, 1, 0]},
            "edgedata": {"0-1": {"q": 2}, "1-7": {"q": 1}}
        }"#;
        let mesh = Mesh::from_json(text).unwrap();

        assert_eq!(3, mesh.number_of_vertices());
        assert_eq!(1, mesh.number_of_faces());
        assert_eq!(
            Some(Value::Int(2)),
            mesh.edge_attribute(VertexKey::new(1), VertexKey::new(0), "q")
                .unwrap()
        );
        assert!(mesh.is_valid());
        assert_eq!("Mesh", mesh.name());
        // Default positions are restored as well.
        assert_eq!(Some(Value::Float(0.0)), mesh.vertex_attribute(VertexKey::new(2), "z").unwrap());
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(Mesh::from_json("{"), Err(MeshError::Encoding(_))));
        assert!(matches!(
            Mesh::from_json(r#"{"vertex": {}, "face": {}, "edgedata": {"01": {}}}"#),
            Err(MeshError::Encoding(_))
        ));
    }

    #[test]
    fn non_finite_attributes_are_rejected() {
        let mut mesh = triangulated_square();
        let (a, c) = (VertexKey::new(0), VertexKey::new(2));
        mesh.set_vertex_attribute(a, "w", f64::NAN).unwrap();
        assert!(matches!(mesh.to_json(), Err(MeshError::Encoding(_))));
        assert!(serde_json::to_string(&mesh).is_err());

        mesh.set_vertex_attribute(a, "w", 1.0).unwrap();
        mesh.set_edge_attribute(a, c, "w", f64::INFINITY).unwrap();
        assert!(matches!(mesh.to_json(), Err(MeshError::Encoding(_))));

        mesh.unset_edge_attribute(a, c, "w").unwrap();
        let decoded = Mesh::from_json(&mesh.to_json().unwrap()).unwrap();
        assert_eq!(Some(Value::Float(1.0)), decoded.vertex_attribute(a, "w").unwrap());
    }

    #[test]
    fn shared_halfedge_goes_to_greatest_key() {
        let mut mesh = Mesh::new();
        let v = (0..4)
            .map(|_| mesh.add_vertex(None, Attributes::new()))
            .collect::<Vec<_>>();
        mesh.add_face(vec![v[0], v[1], v[2]], Some(FaceKey::new(5)), Attributes::new())
            .unwrap();
        mesh.add_face(vec![v[0], v[1], v[3]], Some(FaceKey::new(2)), Attributes::new())
            .unwrap();
        assert_eq!(Some(Side::Face(FaceKey::new(2))), mesh.halfedge(v[0], v[1]));

        let restored = Mesh::from_data(mesh.to_data());
        assert_eq!(2, restored.number_of_faces());
        assert_eq!(Some(Side::Face(FaceKey::new(5))), restored.halfedge(v[0], v[1]));
    }

    proptest! {
        #[test]
        fn round_trip(
            n in 3usize..12,
            triangles in proptest::collection::vec((0usize..12, 0usize..12, 0usize..12), 1..16),
        ) {
            let faces = triangles
                .into_iter()
                .map(|(a, b, c)| vec![a % n, b % n, c % n])
                .filter(|face| face[0] != face[1] && face[1] != face[2] && face[2] != face[0])
                .collect::<Vec<_>>();
            let vertices = (0..n).map(|i| [i as f64, (i * i) as f64, 0.0]).collect::<Vec<_>>();
            let mut mesh = Mesh::from_vertices_and_faces(vertices, faces).unwrap();
            let first = mesh.edges().next();
            if let Some((u, v)) = first {
                mesh.set_edge_attribute(u, v, "weight", 0.5).unwrap();
            }

            let decoded = Mesh::from_json(&mesh.to_json().unwrap()).unwrap();
            prop_assert_eq!(mesh.number_of_vertices(), decoded.number_of_vertices());
            prop_assert_eq!(mesh.number_of_faces(), decoded.number_of_faces());
            prop_assert_eq!(mesh.number_of_edges(), decoded.number_of_edges());
            assert_same(&mesh, &decoded);
        }
    }
}
