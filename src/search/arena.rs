use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;

/// Growable storage for tree nodes. Nodes refer to each other through `Index` values
/// instead of owning pointers, so parent links never form ownership cycles.
pub struct Arena<T> {
    data: Vec<T>,
}

/// Handle to a value in an `Arena`. Only valid for the arena that created it.
pub struct Index<T> {
    data: NonZeroU32,
    phantom: PhantomData<T>,
}

impl<T> Index<T> {
    fn new(position: usize) -> Self {
        // Offset by one, so that `Option<Index<T>>` is the same size as `Index<T>`
        let data = u32::try_from(position)
            .ok()
            .and_then(|position| NonZeroU32::MIN.checked_add(position))
            .unwrap_or_else(|| panic!("Arena index {} does not fit in 32 bits", position));
        Self {
            data,
            phantom: PhantomData,
        }
    }

    fn position(self) -> usize {
        self.data.get() as usize - 1
    }
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Index<T> {}

impl<T> PartialEq for Index<T> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T> Eq for Index<T> {}

impl<T> fmt::Debug for Index<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.position())
    }
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn get(&self, index: Index<T>) -> &T {
        &self.data[index.position()]
    }

    pub fn get_mut(&mut self, index: Index<T>) -> &mut T {
        &mut self.data[index.position()]
    }

    pub fn add(&mut self, value: T) -> Index<T> {
        let index = Index::new(self.data.len());
        self.data.push(value);
        index
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}
