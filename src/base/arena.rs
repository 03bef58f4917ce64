use crate::StrError;
use std::fmt;
use std::marker::PhantomData;

/// Identifies an entity stored in an [Arena]
///
/// The handle is an index into the contiguous store; the type parameter prevents
/// using a surface handle to access, e.g., a domain.
pub struct Handle<T> {
    index: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Returns the position of the entity in the arena
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// Owns all entities of one kind (domains, surfaces, interfaces, constraints)
///
/// Entities are never removed, thus handles remain valid for the lifetime of the arena.
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Arena<T> {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        Arena { items: Vec::new() }
    }

    /// Moves an entity into the arena and returns its handle
    pub fn insert(&mut self, item: T) -> Handle<T> {
        let index = self.items.len();
        self.items.push(item);
        Handle {
            index,
            marker: PhantomData,
        }
    }

    /// Returns an access to an entity
    pub fn get(&self, handle: Handle<T>) -> &T {
        &self.items[handle.index]
    }

    /// Returns a mutable access to an entity
    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.items[handle.index]
    }

    /// Returns mutable accesses to two distinct entities
    pub fn pair_mut(&mut self, a: Handle<T>, b: Handle<T>) -> Result<(&mut T, &mut T), StrError> {
        if a.index == b.index {
            return Err("pair_mut requires two distinct handles");
        }
        if a.index < b.index {
            let (left, right) = self.items.split_at_mut(b.index);
            Ok((&mut left[a.index], &mut right[0]))
        } else {
            let (left, right) = self.items.split_at_mut(a.index);
            Ok((&mut right[0], &mut left[b.index]))
        }
    }

    /// Returns the number of entities
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Tells whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns an iterator over all entities (in insertion order)
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns a mutable iterator over all entities (in insertion order)
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Returns the handles of all entities (in insertion order)
    pub fn handles(&self) -> Vec<Handle<T>> {
        (0..self.items.len())
            .map(|index| Handle {
                index,
                marker: PhantomData,
            })
            .collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Arena;

    #[test]
    fn insert_and_get_work() {
        let mut arena = Arena::new();
        assert!(arena.is_empty());
        let a = arena.insert("first".to_string());
        let b = arena.insert("second".to_string());
        assert_eq!(arena.len(), 2);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.get(b), "second");
        arena.get_mut(a).push('!');
        assert_eq!(arena.get(a), "first!");
        assert_eq!(format!("{:?}", b), "Handle(1)");
        assert_eq!(arena.handles(), vec![a, b]);
    }

    #[test]
    fn pair_mut_works() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        assert_eq!(arena.pair_mut(a, a).err(), Some("pair_mut requires two distinct handles"));
        {
            let (x, y) = arena.pair_mut(b, a).unwrap();
            *x += 10;
            *y += 100;
        }
        assert_eq!(arena.get(a), &101);
        assert_eq!(arena.get(b), &12);
        let (x, y) = arena.pair_mut(a, b).unwrap();
        assert_eq!((*x, *y), (101, 12));
    }
}
