//! Encodings.
//!
//! This module provides encoding support enabled via Cargo features. Each
//! enabled encoding has a corresponding sub-module. The following table
//! summarizes the encodings supported by hemesh:
//!
//! | Feature        | Default | Encoding | Read | Write |
//! |----------------|---------|----------|------|-------|
//! | `encoding-ply` | No      | [PLY]    | Yes  | No    |
//!
//! The structural JSON snapshot of a mesh is always available and is provided
//! by [`Mesh::to_json`] and [`Mesh::from_json`].
//!
//! [`Mesh::from_json`]: crate::mesh::Mesh::from_json
//! [`Mesh::to_json`]: crate::mesh::Mesh::to_json
//! [PLY]: https://en.wikipedia.org/wiki/ply_(file_format)

pub mod ply;
