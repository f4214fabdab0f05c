//! [PLY](https://en.wikipedia.org/wiki/PLY_(file_format)) encoding.
//!
//! PLY support is implemented using the
//! [`ply-rs`](https://crates.io/crates/ply-rs) crate. Vertices are read from
//! the `x`, `y`, and `z` properties of the `vertex` element and faces are read
//! from the `vertex_indices` (or `vertex_index`) list of the `face` element.
//!
//! # Examples
//!
//! ```rust
//! use hemesh::encoding::ply::FromPly;
//! use hemesh::Mesh;
//!
//! let ply: &[u8] = b"ply
//! format ascii 1.0
//! element vertex 3
//! property float x
//! property float y
//! property float z
//! element face 1
//! property list uchar int vertex_indices
//! end_header
//! 0 0 0
//! 1 0 0
//! 0 1 0
//! 3 0 1 2
//! ";
//! let (mesh, _) = Mesh::from_ply(ply).unwrap();
//! assert!(mesh.is_trimesh());
//! ```

#![cfg(feature = "encoding-ply")]

use num::cast;
use num::NumCast;
use ply_rs::parser::Parser;
use ply_rs::ply::KeyMap;
use std::io::{self, Read};
use std::iter::FromIterator;
use thiserror::Error;

use crate::mesh::{Mesh, MeshError};

pub use ply_rs::ply::{
    ElementDef as ElementDefinition, Property, PropertyDef as PropertyDefinition, PropertyType,
};

pub type Header = KeyMap<ElementDefinition>;
pub type Payload = KeyMap<Vec<Element>>;
pub type Element = KeyMap<Property>;

const FACE_INDEX_PROPERTIES: [&str; 2] = ["vertex_indices", "vertex_index"];

#[derive(Debug, Error)]
pub enum PlyError {
    #[error("element not found: {0}")]
    ElementNotFound(&'static str),
    #[error("property not found: {0}")]
    PropertyNotFound(&'static str),
    #[error("property has an unexpected type or value")]
    Encoding,
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<PlyError> for MeshError {
    fn from(error: PlyError) -> Self {
        match error {
            PlyError::Mesh(error) => error,
            error => MeshError::Encoding(error.to_string()),
        }
    }
}

pub trait ElementExt {
    fn read_scalar<T>(&self, key: &'static str) -> Result<T, PlyError>
    where
        T: NumCast;

    fn read_list<T, I>(&self, key: &'static str) -> Result<I, PlyError>
    where
        T: NumCast,
        I: FromIterator<T>;
}

impl ElementExt for Element {
    fn read_scalar<T>(&self, key: &'static str) -> Result<T, PlyError>
    where
        T: NumCast,
    {
        self.get(key)
            .ok_or(PlyError::PropertyNotFound(key))?
            .clone()
            .into_scalar()
    }

    fn read_list<T, I>(&self, key: &'static str) -> Result<I, PlyError>
    where
        T: NumCast,
        I: FromIterator<T>,
    {
        self.get(key)
            .ok_or(PlyError::PropertyNotFound(key))?
            .clone()
            .into_list()
    }
}

pub trait PropertyExt {
    fn into_scalar<T>(self) -> Result<T, PlyError>
    where
        T: NumCast;

    fn into_list<T, I>(self) -> Result<I, PlyError>
    where
        T: NumCast,
        I: FromIterator<T>;
}

impl PropertyExt for Property {
    fn into_scalar<T>(self) -> Result<T, PlyError>
    where
        T: NumCast,
    {
        match self {
            Property::Char(value) => num_cast_scalar(value),
            Property::UChar(value) => num_cast_scalar(value),
            Property::Short(value) => num_cast_scalar(value),
            Property::UShort(value) => num_cast_scalar(value),
            Property::Int(value) => num_cast_scalar(value),
            Property::UInt(value) => num_cast_scalar(value),
            Property::Float(value) => num_cast_scalar(value),
            Property::Double(value) => num_cast_scalar(value),
            _ => Err(PlyError::Encoding),
        }
    }

    fn into_list<T, I>(self) -> Result<I, PlyError>
    where
        T: NumCast,
        I: FromIterator<T>,
    {
        match self {
            Property::ListChar(values) => num_cast_list(values),
            Property::ListUChar(values) => num_cast_list(values),
            Property::ListShort(values) => num_cast_list(values),
            Property::ListUShort(values) => num_cast_list(values),
            Property::ListInt(values) => num_cast_list(values),
            Property::ListUInt(values) => num_cast_list(values),
            Property::ListFloat(values) => num_cast_list(values),
            Property::ListDouble(values) => num_cast_list(values),
            _ => Err(PlyError::Encoding),
        }
    }
}

pub trait FromPly: Sized {
    fn from_ply<R>(read: R) -> Result<(Self, Header), PlyError>
    where
        R: Read;
}

impl FromPly for Mesh {
    fn from_ply<R>(mut read: R) -> Result<(Self, Header), PlyError>
    where
        R: Read,
    {
        let ply = Parser::<Element>::new().read_ply(&mut read)?;
        let vertices = elements(&ply.payload, "vertex")?
            .iter()
            .map(|element| {
                Ok([
                    element.read_scalar::<f64>("x")?,
                    element.read_scalar::<f64>("y")?,
                    element.read_scalar::<f64>("z")?,
                ])
            })
            .collect::<Result<Vec<_>, PlyError>>()?;
        let faces = match ply.payload.get("face") {
            Some(elements) => elements
                .iter()
                .map(read_face)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let mesh = Mesh::from_vertices_and_faces(vertices, faces)?;
        Ok((mesh, ply.header.elements))
    }
}

fn elements<'a>(payload: &'a Payload, name: &'static str) -> Result<&'a Vec<Element>, PlyError> {
    payload.get(name).ok_or(PlyError::ElementNotFound(name))
}

fn read_face(element: &Element) -> Result<Vec<usize>, PlyError> {
    FACE_INDEX_PROPERTIES
        .iter()
        .find(|key| element.contains_key(**key))
        .ok_or(PlyError::PropertyNotFound(FACE_INDEX_PROPERTIES[0]))
        .and_then(|key| element.read_list::<usize, _>(*key))
}

fn num_cast_scalar<T, U>(value: T) -> Result<U, PlyError>
where
    T: NumCast,
    U: NumCast,
{
    cast::cast(value).ok_or(PlyError::Encoding)
}

fn num_cast_list<T, U, I>(values: Vec<T>) -> Result<I, PlyError>
where
    T: NumCast,
    U: NumCast,
    I: FromIterator<U>,
{
    values
        .into_iter()
        .map(num_cast_scalar)
        .collect::<Result<_, _>>()
}
