//! Single-writer latest-value cells.

use std::sync::{Arc, Mutex};

/// Latest-value cell for one signal.
///
/// One task publishes, any number read. A reader always sees a complete
/// struct from some single write (never a torn mix of two writes);
/// last-write-wins, and there is no ordering guarantee between independent
/// cells. `get` returns `None` until the first publish.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Copy> Latest<T> {
    /// Empty cell.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the stored value.
    pub fn publish(&self, value: T) {
        *self.slot.lock().unwrap() = Some(value);
    }

    /// Read the most recently published value, if any.
    pub fn get(&self) -> Option<T> {
        *self.slot.lock().unwrap()
    }
}

impl<T: Copy> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}
