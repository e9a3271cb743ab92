//! Open-addressing hash table with tombstones, used for globals, per-class
//! method tables, and per-instance field tables. Interning itself is handled
//! by [`crate::heap::Heap::intern`], which needs byte-content comparison the
//! keys stored here (already-interned `StrId`s) never require.

use crate::object::StrId;
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Tombstone,
    Occupied { key: StrId, hash: u32, value: Value },
}

pub struct Table {
    entries: Vec<Slot>,
    /// Live entries, excluding tombstones.
    count: usize,
    /// Live entries *and* tombstones, since tombstones count toward load
    /// factor until the next rehash.
    occupied: usize,
}

impl Table {
    pub fn new() -> Self {
        Self { entries: Vec::new(), count: 0, occupied: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Probe for `key`'s slot (or the first tombstone/empty slot that would
    /// take it) starting at `hash & (capacity - 1)`, wrapping with `+1 & mask`
    /// as required for power-of-two capacities.
    fn find_slot(entries: &[Slot], capacity: usize, key: StrId, hash: u32) -> usize {
        let mask = capacity - 1;
        let mut index = (hash as usize) & mask;
        let mut tombstone: Option<usize> = None;
        loop {
            match entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: k, .. } if k == key => return index,
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) & mask;
        }
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut new_entries = vec![Slot::Empty; new_capacity];
        let mut live = 0;
        for slot in &self.entries {
            if let Slot::Occupied { key, hash, value } = *slot {
                let idx = Self::find_slot(&new_entries, new_capacity, key, hash);
                new_entries[idx] = Slot::Occupied { key, hash, value };
                live += 1;
            }
        }
        self.entries = new_entries;
        self.count = live;
        self.occupied = live;
    }

    fn ensure_capacity(&mut self) {
        if self.capacity() == 0 {
            self.grow(8);
            return;
        }
        if (self.occupied + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow(self.capacity() * 2);
        }
    }

    /// Insert or overwrite `key -> value`. Returns `true` if the key was not
    /// already present (a tombstone reused for an insert still counts as new).
    pub fn insert(&mut self, key: StrId, hash: u32, value: Value) -> bool {
        self.ensure_capacity();
        let idx = Self::find_slot(&self.entries, self.capacity(), key, hash);
        let is_new = !matches!(self.entries[idx], Slot::Occupied { .. });
        let was_tombstone = matches!(self.entries[idx], Slot::Tombstone);
        self.entries[idx] = Slot::Occupied { key, hash, value };
        if is_new {
            self.count += 1;
            if !was_tombstone {
                self.occupied += 1;
            }
        }
        is_new
    }

    pub fn get(&self, key: StrId, hash: u32) -> Option<Value> {
        if self.capacity() == 0 {
            return None;
        }
        match self.entries[Self::find_slot(&self.entries, self.capacity(), key, hash)] {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: StrId, hash: u32) -> bool {
        self.get(key, hash).is_some()
    }

    /// Mark the slot a tombstone. Returns `true` if the key was present.
    pub fn remove(&mut self, key: StrId, hash: u32) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let idx = Self::find_slot(&self.entries, self.capacity(), key, hash);
        if matches!(self.entries[idx], Slot::Occupied { .. }) {
            self.entries[idx] = Slot::Tombstone;
            self.count -= 1;
            true
        } else {
            false
        }
    }

    /// Used by the intern pool: find a key by hash and content predicate
    /// before a `String` object for those bytes necessarily exists yet.
    pub fn find_string(&self, hash: u32, mut content_matches: impl FnMut(StrId) -> bool) -> Option<StrId> {
        if self.capacity() == 0 {
            return None;
        }
        let mask = self.capacity() - 1;
        let mut index = (hash as usize) & mask;
        loop {
            match self.entries[index] {
                Slot::Empty => return None,
                Slot::Occupied { key, hash: h, .. } if h == hash && content_matches(key) => {
                    return Some(key);
                }
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    pub fn copy_into(&self, dest: &mut Table) {
        for slot in &self.entries {
            if let Slot::Occupied { key, hash, value } = *slot {
                dest.insert(key, hash, value);
            }
        }
    }

    /// Drop every entry whose key fails `keep`, turning it into a tombstone.
    /// Used by the GC's weak-string pass to evict intern-pool entries for
    /// strings the mark phase did not reach.
    pub fn retain(&mut self, mut keep: impl FnMut(StrId, Value) -> bool) {
        for slot in &mut self.entries {
            if let Slot::Occupied { key, value, .. } = *slot {
                if !keep(key, value) {
                    *slot = Slot::Tombstone;
                    self.count -= 1;
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StrId, Value)> + '_ {
        self.entries.iter().filter_map(|s| match *s {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut t = Table::new();
        assert!(t.insert(1, 100, Value::number(42.0)));
        assert_eq!(t.get(1, 100), Some(Value::number(42.0)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn inserting_an_existing_key_overwrites_and_is_not_new() {
        let mut t = Table::new();
        assert!(t.insert(1, 100, Value::number(1.0)));
        assert!(!t.insert(1, 100, Value::number(2.0)));
        assert_eq!(t.get(1, 100), Some(Value::number(2.0)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn remove_turns_key_into_a_tombstone_that_insert_can_reuse() {
        let mut t = Table::new();
        t.insert(1, 100, Value::number(1.0));
        assert!(t.remove(1, 100));
        assert_eq!(t.get(1, 100), None);
        assert_eq!(t.len(), 0);
        // Reinserting after a removal must count as new again.
        assert!(t.insert(1, 100, Value::number(3.0)));
        assert_eq!(t.get(1, 100), Some(Value::number(3.0)));
    }

    #[test]
    fn grows_past_the_max_load_factor_without_losing_entries() {
        let mut t = Table::new();
        for key in 0..200u32 {
            t.insert(key, key, Value::number(key as f64));
        }
        assert_eq!(t.len(), 200);
        for key in 0..200u32 {
            assert_eq!(t.get(key, key), Some(Value::number(key as f64)));
        }
    }

    #[test]
    fn find_string_matches_by_hash_and_content_predicate() {
        let mut t = Table::new();
        t.insert(7, 555, Value::nil());
        let found = t.find_string(555, |key| key == 7);
        assert_eq!(found, Some(7));
        let missed = t.find_string(555, |key| key == 9);
        assert_eq!(missed, None);
    }

    #[test]
    fn copy_into_duplicates_every_live_entry() {
        let mut src = Table::new();
        src.insert(1, 10, Value::number(1.0));
        src.insert(2, 20, Value::number(2.0));
        let mut dest = Table::new();
        src.copy_into(&mut dest);
        assert_eq!(dest.len(), 2);
        assert_eq!(dest.get(1, 10), Some(Value::number(1.0)));
        assert_eq!(dest.get(2, 20), Some(Value::number(2.0)));
    }
}
