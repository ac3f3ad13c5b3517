//! Handle-indexed table of game objects.
//!
//! Handles are issued from a monotonically increasing counter and never reused. Removing an entry
//! leaves a tombstone, so a stale handle can never alias a newer object; lookups on tombstoned or
//! unknown handles return `None`.

/// Opaque handle to an object stored in a [`GameArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameHandle(u64);

impl std::fmt::Display for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "game#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct GameArena<T> {
    slots: Vec<Option<T>>,
}

impl<T> GameArena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, value: T) -> GameHandle {
        let handle = GameHandle(self.slots.len() as u64);
        self.slots.push(Some(value));
        handle
    }

    pub fn get(&self, handle: GameHandle) -> Option<&T> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: GameHandle) -> Option<&mut T> {
        self.slots.get_mut(handle.0 as usize)?.as_mut()
    }

    /// Tombstone the entry and hand back its value.
    pub fn remove(&mut self, handle: GameHandle) -> Option<T> {
        self.slots.get_mut(handle.0 as usize)?.take()
    }

    /// Number of live (non-tombstoned) entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for GameArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
