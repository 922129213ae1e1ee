use std::ops::Index;

/// Append-only arena of values addressed by their insertion index.
///
/// Values are never removed or moved, so an index handed out by [`add`]
/// stays valid for the lifetime of the storage.
///
/// [`add`]: Storage::add
#[derive(Debug, Clone)]
pub struct Storage<T> {
    data: Vec<T>,
}

impl<T> Storage<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of stored values.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert!(
            index < self.data.len(),
            "Index {} is out of bounds (size {})",
            index,
            self.data.len()
        );
        &self.data[index]
    }

    /// Store a new value and return its index.
    pub fn add(&mut self, value: T) -> usize {
        self.data.push(value);
        self.data.len() - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for Storage<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
