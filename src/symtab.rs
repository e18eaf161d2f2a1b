//! Integer-keyed Robin Hood hash table (runtime component C2).
//!
//! Maps a SipHash of a name (the symbol id, see [`crate::hash::siphash_cstr`])
//! to the owned printable name string. Used for both `type_name` lookup
//! and the built-in dunder-name pool, so probing must stay cheap even as
//! thousands of names accumulate during a long-running program.
//!
//! Ported from `original_source/nagini/compiler/c/hmap.h`: same initial
//! capacity, load factor, SplitMix64-style key mixer, Robin Hood
//! insertion with PSL-based displacement, early-exit lookup on PSL
//! overrun, and backward-shift deletion.

const INITIAL_CAPACITY: usize = 2;
const LOAD_FACTOR_PERCENT: usize = 85;

#[derive(Clone)]
struct Entry {
    key: i64,
    value: String,
    psl: i32,
}

/// A slot is either empty or occupied; `psl == -1` marks empty, mirroring
/// the original's sentinel (a probe sequence length can never be
/// negative for an occupied slot).
impl Entry {
    fn empty() -> Entry {
        Entry {
            key: 0,
            value: String::new(),
            psl: -1,
        }
    }

    fn is_occupied(&self) -> bool {
        self.psl >= 0
    }
}

/// Mixes an arbitrary `i64` key into a `usize` bucket index the way
/// `_hmap_hash` does: a SplitMix64 finalizer, then truncate to the table
/// mask.
fn mix_key(key: i64) -> u64 {
    let mut z = key as u64;
    z = z.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

pub struct SymbolTable {
    entries: Vec<Entry>,
    count: usize,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            entries: vec![Entry::empty(); INITIAL_CAPACITY],
            count: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn bucket(&self, key: i64) -> usize {
        (mix_key(key) as usize) & (self.capacity() - 1)
    }

    fn should_grow(&self) -> bool {
        self.count * 100 >= self.capacity() * LOAD_FACTOR_PERCENT
    }

    fn resize(&mut self, new_capacity: usize) {
        let old = std::mem::replace(&mut self.entries, vec![Entry::empty(); new_capacity]);
        self.count = 0;
        for e in old {
            if e.is_occupied() {
                self.insert_inner(e.key, e.value);
            }
        }
    }

    fn insert_inner(&mut self, key: i64, value: String) {
        let cap = self.capacity();
        let mut idx = self.bucket(key);
        let mut incoming = Entry { key, value, psl: 0 };

        loop {
            if !self.entries[idx].is_occupied() {
                self.entries[idx] = incoming;
                self.count += 1;
                return;
            }
            if self.entries[idx].key == incoming.key {
                self.entries[idx].value = incoming.value;
                return;
            }
            if self.entries[idx].psl < incoming.psl {
                std::mem::swap(&mut self.entries[idx], &mut incoming);
            }
            incoming.psl += 1;
            idx = (idx + 1) & (cap - 1);
        }
    }

    /// Insert or overwrite `key -> value`, growing the table first if
    /// the load factor would be exceeded.
    pub fn put(&mut self, key: i64, value: String) {
        if self.should_grow() {
            self.resize(self.capacity() * 2);
        }
        self.insert_inner(key, value);
    }

    /// Look up `key`, bailing out as soon as the current slot's PSL is
    /// shorter than the number of probes already made — Robin Hood's
    /// early-exit guarantee that `key` cannot appear further along.
    pub fn get(&self, key: i64) -> Option<&str> {
        let cap = self.capacity();
        let mut idx = self.bucket(key);
        let mut probe_len = 0i32;

        loop {
            let e = &self.entries[idx];
            if !e.is_occupied() || probe_len > e.psl {
                return None;
            }
            if e.key == key {
                return Some(&e.value);
            }
            probe_len += 1;
            idx = (idx + 1) & (cap - 1);
        }
    }

    /// Remove `key`, backward-shifting later entries in its probe chain
    /// to close the gap instead of tombstoning, so future lookups keep
    /// their early-exit guarantee intact.
    pub fn remove(&mut self, key: i64) -> Option<String> {
        let cap = self.capacity();
        let mut idx = self.bucket(key);
        let mut probe_len = 0i32;

        loop {
            let e = &self.entries[idx];
            if !e.is_occupied() || probe_len > e.psl {
                return None;
            }
            if e.key == key {
                break;
            }
            probe_len += 1;
            idx = (idx + 1) & (cap - 1);
        }

        let removed = std::mem::replace(&mut self.entries[idx], Entry::empty()).value;
        self.count -= 1;

        let mut cur = idx;
        loop {
            let next = (cur + 1) & (cap - 1);
            if !self.entries[next].is_occupied() || self.entries[next].psl == 0 {
                break;
            }
            self.entries[next].psl -= 1;
            self.entries.swap(cur, next);
            cur = next;
        }

        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for SymbolTable {
    fn default() -> SymbolTable {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut t = SymbolTable::new();
        t.put(42, "answer".to_string());
        assert_eq!(t.get(42), Some("answer"));
        assert_eq!(t.get(7), None);
    }

    #[test]
    fn overwrite_updates_existing_key() {
        let mut t = SymbolTable::new();
        t.put(1, "a".to_string());
        t.put(1, "b".to_string());
        assert_eq!(t.get(1), Some("b"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn grows_past_many_insertions_without_losing_entries() {
        let mut t = SymbolTable::new();
        for i in 0..500i64 {
            t.put(i, format!("sym{i}"));
        }
        assert_eq!(t.len(), 500);
        for i in 0..500i64 {
            assert_eq!(t.get(i), Some(format!("sym{i}")).as_deref());
        }
    }

    #[test]
    fn remove_then_lookups_for_other_keys_still_succeed() {
        let mut t = SymbolTable::new();
        for i in 0..64i64 {
            t.put(i, format!("v{i}"));
        }
        for i in (0..64i64).step_by(2) {
            assert!(t.remove(i).is_some());
        }
        for i in 0..64i64 {
            if i % 2 == 0 {
                assert_eq!(t.get(i), None);
            } else {
                assert_eq!(t.get(i), Some(format!("v{i}")).as_deref());
            }
        }
    }
}
