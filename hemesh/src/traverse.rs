//! Breadth- and depth-first traversals over keyed adjacency.
//!
//! A [`Traversal`] visits each key reachable from a starting key exactly once.
//! Adjacency is provided by a function, so traversals are independent of how
//! the underlying topology is stored.

use ahash::AHashSet;
use std::collections::VecDeque;
use std::hash::Hash;
use std::marker::PhantomData;

pub enum Breadth {}
pub enum Depth {}

pub trait Order<T> {
    type Buffer: Buffer<T>;
}

impl<T> Order<T> for Breadth {
    type Buffer = VecDeque<T>;
}

impl<T> Order<T> for Depth {
    type Buffer = Vec<T>;
}

pub trait Buffer<T>: Default + Extend<T> {
    fn push(&mut self, item: T);
    fn pop(&mut self) -> Option<T>;
}

impl<T> Buffer<T> for Vec<T> {
    fn push(&mut self, item: T) {
        Vec::<T>::push(self, item)
    }

    fn pop(&mut self) -> Option<T> {
        Vec::<T>::pop(self)
    }
}

impl<T> Buffer<T> for VecDeque<T> {
    fn push(&mut self, item: T) {
        VecDeque::<T>::push_back(self, item)
    }

    fn pop(&mut self) -> Option<T> {
        VecDeque::<T>::pop_front(self)
    }
}

/// Traversal over keys reachable from a starting key.
///
/// Yields each key along with its depth, which is the number of adjacency
/// steps taken from the starting key. Depths are minimal for breadth-first
/// traversals only.
pub struct Traversal<K, F, I, R = Depth>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
    R: Order<(K, usize)>,
{
    adjacency: F,
    breadcrumbs: AHashSet<K>,
    buffer: R::Buffer,
    phantom: PhantomData<fn() -> I>,
}

impl<K, F, I, R> Traversal<K, F, I, R>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
    R: Order<(K, usize)>,
{
    pub fn new(start: K, adjacency: F) -> Self {
        let mut buffer = R::Buffer::default();
        buffer.push((start, 0));
        Traversal {
            adjacency,
            breadcrumbs: AHashSet::new(),
            buffer,
            phantom: PhantomData,
        }
    }
}

impl<K, F, I, R> Iterator for Traversal<K, F, I, R>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
    R: Order<(K, usize)>,
{
    type Item = (K, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, depth)) = self.buffer.pop() {
            if self.breadcrumbs.insert(key) {
                let breadcrumbs = &self.breadcrumbs;
                let adjacent = (self.adjacency)(key)
                    .into_iter()
                    .filter(|adjacent| !breadcrumbs.contains(adjacent))
                    .map(|adjacent| (adjacent, depth + 1))
                    .collect::<Vec<_>>();
                self.buffer.extend(adjacent);
                return Some((key, depth));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::traverse::{Breadth, Depth, Traversal};

    // Path graph 0-1-2-3 with a chord 0-2.
    fn adjacency(key: usize) -> Vec<usize> {
        match key {
            0 => vec![1, 2],
            1 => vec![0, 2],
            2 => vec![1, 3, 0],
            3 => vec![2],
            _ => vec![],
        }
    }

    #[test]
    fn traverse_by_breadth() {
        let visited = Traversal::<_, _, _, Breadth>::new(0usize, adjacency).collect::<Vec<_>>();
        assert_eq!(vec![(0, 0), (1, 1), (2, 1), (3, 2)], visited);
    }

    #[test]
    fn traverse_by_depth() {
        let visited = Traversal::<_, _, _, Depth>::new(0usize, adjacency)
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        assert_eq!(4, visited.len());
        assert_eq!(0, visited[0]);
    }

    #[test]
    fn traverse_isolated() {
        let visited = Traversal::<_, _, _, Breadth>::new(9usize, adjacency).count();
        assert_eq!(1, visited);
    }
}
