//! **hemesh** is a half-edge topology kernel for polygonal meshes.
//!
//! A [`Mesh`] stores an arbitrary polygonal surface as vertices, faces, and a
//! directed _half-edge_ relation between vertices. Every consecutive pair of
//! vertices $(u,v)$ in the cycle of a face maps to that face, and the opposite
//! half-edge $(v,u)$ always exists as well. When no face lies on the other side
//! of an edge, the opposite half-edge refers to the [boundary][`Side`] instead
//! of a face.
//!
//! Vertices, edges, and faces carry named [attributes][`Attributes`] layered
//! over per-mesh defaults. Vertex positions are the `x`, `y`, and `z`
//! attributes of a vertex.
//!
//! # Examples
//!
//! Building a quadrilateral and querying its boundary:
//!
//! ```rust
//! use hemesh::Mesh;
//!
//! let mesh = Mesh::from_vertices_and_faces(
//!     vec![
//!         [0.0, 0.0, 0.0],
//!         [1.0, 0.0, 0.0],
//!         [1.0, 1.0, 0.0],
//!         [0.0, 1.0, 0.0],
//!     ],
//!     vec![vec![0usize, 1, 2, 3]],
//! )
//! .unwrap();
//!
//! assert_eq!(4, mesh.number_of_vertices());
//! assert_eq!(4, mesh.vertices_on_boundary().len());
//! assert!(mesh.is_quadmesh());
//! ```
#![allow(unknown_lints)] // Allow clippy lints.

pub mod attribute;
pub mod encoding;
pub mod key;
pub mod mesh;
pub mod storage;
pub mod traverse;

pub use crate::attribute::{Attributes, AttributeView, AttributeViewMut, Layered, LayeredMut, Value};
pub use crate::key::{EdgeKey, FaceKey, VertexKey};
pub use crate::mesh::{Mesh, MeshData, MeshError, Side};

pub mod prelude {
    //! Re-exports commonly used types and traits.
    //!
    //! The attribute capability traits are re-exported so that `get`, `set`,
    //! and `unset` can be called on attribute views without lengthy imports.

    pub use crate::attribute::{AttributeView as _, AttributeViewMut as _};
    pub use crate::IteratorExt as _;
    pub use crate::{Arity, Attributes, Mesh, MeshError, Side, Value};
    pub use crate::{EdgeKey, FaceKey, VertexKey};
}

/// Arity of the faces in a mesh.
///
/// A mesh with uniform arity has faces that all share the same number of
/// vertices. Otherwise, the minimum and maximum arity are reported.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arity {
    Uniform(usize),
    NonUniform(usize, usize),
}

impl Arity {
    /// Computes the arity from the lengths of face cycles.
    ///
    /// Returns `None` if there are no faces.
    pub fn from_lengths<I>(lengths: I) -> Option<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut lengths = lengths.into_iter();
        let first = lengths.next()?;
        let (min, max) = lengths.fold((first, first), |(min, max), n| (min.min(n), max.max(n)));
        Some(if min == max {
            Arity::Uniform(min)
        }
        else {
            Arity::NonUniform(min, max)
        })
    }
}

/// Extension methods for types implementing `Iterator`.
pub trait IteratorExt: Iterator + Sized {
    /// Provides an iterator over a window of duplets that wraps around to the
    /// first item.
    ///
    /// Given the cycle of a face $\\{a, b, c\\}$, this iterator yields its
    /// half-edges $\\{(a, b), (b, c), (c, a)\\}$.
    fn perimeter(self) -> Perimeter<Self>
    where
        Self::Item: Clone;
}

impl<I> IteratorExt for I
where
    I: Iterator,
{
    fn perimeter(self) -> Perimeter<I>
    where
        I::Item: Clone,
    {
        Perimeter::new(self)
    }
}

/// Iterator over the closing window of duplets of its input.
///
/// See [`IteratorExt::perimeter`].
pub struct Perimeter<I>
where
    I: Iterator,
    I::Item: Clone,
{
    input: I,
    first: Option<I::Item>,
    previous: Option<I::Item>,
}

impl<I> Perimeter<I>
where
    I: Iterator,
    I::Item: Clone,
{
    fn new(mut input: I) -> Self {
        let first = input.next();
        Perimeter {
            input,
            previous: first.clone(),
            first,
        }
    }
}

impl<I> Iterator for Perimeter<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = (I::Item, I::Item);

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.input.next().or_else(|| self.first.take())?;
        let previous = self.previous.replace(next.clone())?;
        Some((previous, next))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Arity, IteratorExt};

    #[test]
    fn perimeter_wraps() {
        let pairs = [1, 2, 3].iter().copied().perimeter().collect::<Vec<_>>();
        assert_eq!(vec![(1, 2), (2, 3), (3, 1)], pairs);
    }

    #[test]
    fn perimeter_of_empty_and_single() {
        assert_eq!(0, Vec::<u8>::new().into_iter().perimeter().count());
        assert_eq!(vec![(7, 7)], vec![7].into_iter().perimeter().collect::<Vec<_>>());
    }

    #[test]
    fn arity_from_lengths() {
        assert_eq!(None, Arity::from_lengths(vec![]));
        assert_eq!(Some(Arity::Uniform(3)), Arity::from_lengths(vec![3, 3]));
        assert_eq!(Some(Arity::NonUniform(3, 5)), Arity::from_lengths(vec![4, 3, 5]));
    }
}
