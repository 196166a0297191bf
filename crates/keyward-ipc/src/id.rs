//! Proxy object identifiers.

use core::fmt;

use buggy::{Bug, BugExt};
use serde::{Deserialize, Serialize};

/// Identifies the server-side counterpart of a proxy.
///
/// Ids are minted by an [`ObjectTable`] owned by the session.
/// The generation distinguishes an id from every earlier id
/// that used the same index, so a stale id can never alias a
/// live proxy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Addresses the provider itself instead of an object.
    ///
    /// Used by provider-level (static) calls.
    pub const PROVIDER: Self = Self {
        index: 0,
        generation: 0,
    };

    /// Creates an id from its parts.
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the table index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Reports whether this is [`ObjectId::PROVIDER`].
    #[inline]
    pub const fn is_provider(self) -> bool {
        self.generation == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_provider() {
            write!(f, "provider")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    generation: u32,
    live: bool,
}

/// An arena of [`ObjectId`]s.
///
/// Generations start at one; generation zero is reserved for
/// [`ObjectId::PROVIDER`].
#[derive(Debug, Default)]
pub struct ObjectTable {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl ObjectTable {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Mints a new id.
    pub fn allocate(&mut self) -> Result<ObjectId, Bug> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.entries.len()).assume("object table overflow")?;
                self.entries.push(Entry {
                    generation: 1,
                    live: false,
                });
                index
            }
        };
        let entry = self
            .entries
            .get_mut(index as usize)
            .assume("free list only holds valid indices")?;
        entry.live = true;
        self.live = self.live.checked_add(1).assume("live count overflow")?;
        Ok(ObjectId::new(index, entry.generation))
    }

    /// Releases `id` so that its index can be reused.
    ///
    /// Returns `false` if `id` is not live.
    pub fn release(&mut self, id: ObjectId) -> bool {
        let Some(entry) = self.entries.get_mut(id.index as usize) else {
            return false;
        };
        if !entry.live || entry.generation != id.generation {
            return false;
        }
        entry.live = false;
        entry.generation = match entry.generation.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        self.free.push(id.index);
        self.live = self.live.saturating_sub(1);
        true
    }

    /// Reports whether `id` is live.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.entries
            .get(id.index as usize)
            .is_some_and(|e| e.live && e.generation == id.generation)
    }

    /// Returns the number of live ids.
    pub const fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_bumps_generation() {
        let mut table = ObjectTable::new();
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        assert_ne!(a, b);
        assert_eq!(table.live(), 2);

        assert!(table.release(a));
        assert!(!table.is_live(a));
        let c = table.allocate().unwrap();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(table.is_live(c));
        assert!(!table.is_live(a));
    }

    #[test]
    fn test_stale_release() {
        let mut table = ObjectTable::new();
        let a = table.allocate().unwrap();
        assert!(table.release(a));
        assert!(!table.release(a));
        assert!(!table.release(ObjectId::new(42, 1)));
        assert!(!table.release(ObjectId::PROVIDER));
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn test_never_mints_provider() {
        let mut table = ObjectTable::new();
        for _ in 0..8 {
            let id = table.allocate().unwrap();
            assert!(!id.is_provider());
        }
    }
}
