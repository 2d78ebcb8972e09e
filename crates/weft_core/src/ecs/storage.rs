// storage.rs - Per-kind component columns indexed by entity slot
//
// Every component kind gets one column. Rows are addressed by the entity's
// slot index; the store validates generations before touching a column, so
// columns never see a stale handle.

use std::any::Any;

/// Type-erased view of a column, enough to drop a row without knowing `T`.
pub(crate) trait ErasedColumn: Send + Sync {
    /// Drop the value stored at `index`, if any.
    fn clear_row(&mut self, index: u32);

    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Sparse column for a single component kind.
pub(crate) struct Column<T> {
    rows: Vec<Option<T>>,
    len: usize,
}

impl<T> Column<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            len: 0,
        }
    }

    /// Store `value` at `index`, returning the value it replaces.
    pub fn insert(&mut self, index: u32, value: T) -> Option<T> {
        let index = index as usize;
        if index >= self.rows.len() {
            self.rows.resize_with(index + 1, || None);
        }
        let previous = self.rows[index].replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn take(&mut self, index: u32) -> Option<T> {
        let taken = self.rows.get_mut(index as usize).and_then(Option::take);
        if taken.is_some() {
            self.len -= 1;
        }
        taken
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.rows.get(index as usize).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.rows.get_mut(index as usize).and_then(Option::as_mut)
    }
}

impl<T: Send + Sync + 'static> ErasedColumn for Column<T> {
    fn clear_row(&mut self, index: u32) {
        self.take(index);
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
