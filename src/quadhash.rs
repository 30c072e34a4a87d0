//! This module contains [QuadHashTable], a hash map using open addressing
//! with quadratic probing.  Entries live directly in a single array of
//! [Slot]s.  A key whose home slot is taken probes the sequence
//!
//! ```text
//!   home + P(x)  (mod capacity),   P(x) = (x*x + x)/2,   x = 0, 1, 2, ...
//! ```
//!
//! The increments P(x) are the triangular numbers.  Combined with a
//! capacity that is always an exact power of two, the first `capacity`
//! probes visit every slot exactly once, so a probe terminates whenever
//! the table has a free slot.  Naive `x*x` probing gives no such guarantee.
//! The capacity is therefore rounded up to a power of two at construction
//! and only ever doubled.
//!
//! Deleted entries leave a [Slot::Tombstone] behind so that keys further
//! along the same probe sequence stay reachable.  Tombstones count toward
//! the load of the table (`used_buckets`), are reused by later insertions,
//! and are dropped when the table is resized or [refreshed](QuadHashTable::refresh).
//! When an existing key is updated after its probe passed over a
//! tombstone, the entry is moved into that tombstone, which shortens
//! future lookups.
//!
//! No operation of this table returns an error: absence is always
//! reported with `None` or `false`.

#![allow(non_snake_case)]
#![allow(unused_parens)]

use core::hash::{BuildHasher, Hash, Hasher};
use std::collections::hash_map::RandomState;
use tracing::{debug, trace};

/// smallest capacity of a non-empty table, a power of two
pub const DEFAULTCAP:usize = 8;
/// load factor used when the requested one is not positive or not a number
pub const DEFAULTLOAD:f64 = 0.65;
/// larger load factors are clamped, keeping at least one empty slot
pub const MAXLOAD:f64 = 0.9;
/// smaller positive load factors are raised to this
pub const MINLOAD:f64 = 0.1;
/// largest power of two a capacity can reach
pub const MAXCAP:usize = 1 << (usize::BITS - 1);

const SIGNBIT:usize = 1 << (usize::BITS - 1);

/// State of one bucket of a [QuadHashTable].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<KT,VT> {
  Empty,
  Filled(KT,VT),
  Tombstone,
}

/// P(x) = (x*x+x)/2, computed without the intermediate overflowing first
pub fn quadratic_probe(x:usize) -> usize {
  if x%2 == 0 {(x/2).wrapping_mul(x+1)}
  else {x.wrapping_mul((x+1)/2)}
}

fn derive_hash<KT:Hash>(rs:&RandomState, key:&KT) -> usize
{
   let mut bs = rs.build_hasher();
   key.hash(&mut bs);
   bs.finish() as usize
}

// smallest power of two holding `want` slots, never below DEFAULTCAP
fn table_capacity(want:usize) -> usize {
  want.max(DEFAULTCAP).checked_next_power_of_two().unwrap_or(MAXCAP)
}

fn threshold(cap:usize, maxload:f64) -> usize {
  ((cap as f64) * maxload) as usize
}

fn empty_slots<KT,VT>(cap:usize) -> Vec<Slot<KT,VT>> {
  let mut slots = Vec::with_capacity(cap);
  slots.resize_with(cap, ||Slot::Empty);
  slots
}

// where the probe sequence of a key ended
struct ProbeResult {
  found : Option<usize>,  // slot holding the key
  tomb : Option<usize>,   // first tombstone passed
  empty : Option<usize>,  // empty slot that ended the search
}

/// Open-addressed hash map with quadratic probing: see the [module
/// documentation](crate::quadhash) for an overview.
#[derive(Clone, Debug)]
pub struct QuadHashTable<KT,VT>
{
  slots : Vec<Slot<KT,VT>>,
  maxload : f64,
  threshold : usize,
  keycount : usize,     // Filled slots
  usedbuckets : usize,  // Filled and Tombstone slots
  userhash : Option<fn(&KT) -> usize>,
  autostate : RandomState,
}
impl<KT:Hash+Eq, VT> QuadHashTable<KT,VT>
{
  /// Creates a table whose capacity is the smallest power of two that is
  /// at least `initcap` (and at least 8).  A load factor that is not a
  /// positive number defaults to 0.65; one above 0.9 is clamped to 0.9
  /// and one below 0.1 is raised to 0.1.
  pub fn with_capacity(initcap:usize, mut maxload:f64) -> Self {
    if maxload.is_nan() || maxload <= 0.0 {
      debug!(requested = maxload, fallback = DEFAULTLOAD, "invalid load factor, using default");
      maxload = DEFAULTLOAD;
    }
    else if maxload > MAXLOAD {
      debug!(requested = maxload, clamped = MAXLOAD, "load factor too large, clamping");
      maxload = MAXLOAD;
    }
    else if maxload < MINLOAD {
      debug!(requested = maxload, clamped = MINLOAD, "load factor too small, clamping");
      maxload = MINLOAD;
    }
    let cap = table_capacity(initcap);
    QuadHashTable {
      slots : empty_slots(cap),
      maxload,
      threshold : threshold(cap, maxload),
      keycount : 0,
      usedbuckets : 0,
      userhash : None,
      autostate : RandomState::new(),
    }
  }//with_capacity

  /// table of capacity 8 and load factor 0.65
  pub fn new() -> Self { Self::with_capacity(DEFAULTCAP, DEFAULTLOAD) }

  /// This function allows the user to override the default hasher
  /// provided by the Hash trait with an arbitrary function.  The
  /// operation is only allowed while the table is empty.  Returns
  /// true on success.
  pub fn set_hash(&mut self, h: fn(&KT)->usize) -> bool {
    if self.keycount > 0 {return false;}
    self.userhash = Some(h);
    true
  }

  fn hash(&self, key:&KT) -> usize {
    self.userhash.map_or_else(|| derive_hash(&self.autostate, key), |f| f(key))
  }

  // capacity is a power of two, so dropping the top bit leaves the
  // residue unchanged while keeping every raw hash in range
  fn normalise_index(&self, h:usize) -> usize {
    (h & !SIGNBIT) % self.slots.len()
  }

  fn probe(&self, key:&KT) -> ProbeResult {
    let mut r = ProbeResult { found:None, tomb:None, empty:None };
    let cap = self.slots.len();
    if cap == 0 {return r;}
    let h = self.hash(key);
    for x in 0..cap {
      let i = self.normalise_index(h.wrapping_add(quadratic_probe(x)));
      match &self.slots[i] {
        Slot::Filled(k,_) if k == key => { r.found = Some(i); break; },
        Slot::Filled(..) => {},
        Slot::Tombstone => { if r.tomb.is_none() {r.tomb = Some(i);} },
        Slot::Empty => { r.empty = Some(i); break; },
      }//match
    }//for
    r
  }//probe

  /// Returns a reference to the value associated with the key, if it exists.
  pub fn get(&self, key:&KT) -> Option<&VT> {
    let i = self.probe(key).found?;
    match &self.slots[i] {
      Slot::Filled(_,v) => Some(v),
      _ => None,
    }
  }//get

  pub fn get_mut(&mut self, key:&KT) -> Option<&mut VT> {
    let i = self.probe(key).found?;
    match &mut self.slots[i] {
      Slot::Filled(_,v) => Some(v),
      _ => None,
    }
  }//get_mut

  /// Determines if the key exists in the table.
  pub fn has_key(&self, key:&KT) -> bool {
    self.probe(key).found.is_some()
  }

  /// Inserts a key-value pair.  If the key already exists its value is
  /// replaced and the old value returned; otherwise None is returned.
  /// The table doubles in size once the number of used buckets (entries
  /// and tombstones) exceeds the load-factor threshold.
  pub fn insert(&mut self, key:KT, val:VT) -> Option<VT> {
    if self.slots.is_empty() {
      self.rebuild(DEFAULTCAP);
    }
    let r = self.probe(&key);
    if let Some(i) = r.found {
      let target = r.tomb.unwrap_or(i);
      let old = core::mem::replace(&mut self.slots[i], Slot::Tombstone);
      self.slots[target] = Slot::Filled(key,val);
      return match old {
        Slot::Filled(_,v) => Some(v),
        _ => None,
      };
    }//replace
    let target = match (r.tomb, r.empty) {
      (Some(t), _) => t,
      (None, Some(e)) => {
        self.usedbuckets += 1;
        e
      },
      (None, None) => {  // no free slot on the probe cycle
        self.resize_table();
        return self.insert(key,val);
      },
    };
    self.slots[target] = Slot::Filled(key,val);
    self.keycount += 1;
    trace!(slot = target, keys = self.keycount, used = self.usedbuckets, "inserted key");
    while self.usedbuckets > self.threshold {
      self.resize_table();
    }
    None
  }//insert

  /// Removes the key and returns its value, if it exists.  The slot
  /// becomes a tombstone and still counts as used until the next resize.
  pub fn remove(&mut self, key:&KT) -> Option<VT> {
    let i = self.probe(key).found?;
    match core::mem::replace(&mut self.slots[i], Slot::Tombstone) {
      Slot::Filled(_,v) => {
        self.keycount -= 1;
        trace!(slot = i, keys = self.keycount, "removed key");
        Some(v)
      },
      other => {
        self.slots[i] = other;
        None
      },
    }
  }//remove

  // doubles capacity, drops tombstones
  fn resize_table(&mut self) {
    let oldcap = self.slots.len();
    let newcap = table_capacity(oldcap.saturating_mul(2));
    self.rebuild(newcap);
    debug!(from = oldcap, to = newcap, keys = self.keycount, "resized quadratic probing table");
  }

  // moves every entry into a fresh array of the given capacity
  fn rebuild(&mut self, newcap:usize) {
    let old = core::mem::replace(&mut self.slots, empty_slots(newcap));
    self.threshold = threshold(newcap, self.maxload);
    self.keycount = 0;
    self.usedbuckets = 0;
    for slot in old {
      if let Slot::Filled(k,v) = slot { self.place(k,v); }
    }
  }//rebuild

  // inserts a key known to be absent into a table without tombstones
  fn place(&mut self, key:KT, val:VT) {
    let h = self.hash(&key);
    for x in 0..self.slots.len() {
      let i = self.normalise_index(h.wrapping_add(quadratic_probe(x)));
      if let Slot::Empty = self.slots[i] {
        self.slots[i] = Slot::Filled(key,val);
        self.keycount += 1;
        self.usedbuckets += 1;
        return;
      }
    }
  }//place

  /// Rebuilds the table at its current capacity, discarding tombstones.
  /// Useful after many removals.
  pub fn refresh(&mut self) {
    let dropped = self.usedbuckets - self.keycount;
    self.rebuild(self.slots.len());
    debug!(tombstones = dropped, "refreshed quadratic probing table");
  }

  /// Empties the table, keeping its capacity.
  pub fn clear(&mut self) {
    for s in self.slots.iter_mut() { *s = Slot::Empty; }
    debug!(removed = self.keycount, capacity = self.slots.len(), "cleared quadratic probing table");
    self.keycount = 0;
    self.usedbuckets = 0;
  }

  /// Moves the contents out, leaving this table empty with capacity 0.
  /// The next insertion reallocates at the default capacity.
  pub fn take(&mut self) -> Self {
    core::mem::take(self)
  }

  /// number of keys in the table
  pub fn size(&self) -> usize { self.keycount }
  pub fn is_empty(&self) -> bool { self.keycount == 0 }
  /// number of slots, always 0 or a power of two
  pub fn capacity(&self) -> usize { self.slots.len() }
  /// number of slots holding an entry or a tombstone
  pub fn used_buckets(&self) -> usize { self.usedbuckets }

  /// number of keys divided by capacity
  pub fn load_factor(&self) -> f64 {
    if self.slots.is_empty() {0.0}
    else {(self.keycount as f64) / (self.slots.len() as f64)}
  }

  /// Read access to the underlying slot array, for inspection and debugging.
  pub fn slots(&self) -> &[Slot<KT,VT>] { &self.slots }

  /// returns an iterator over `(key,value)` pairs in slot order
  pub fn iter<'a>(&'a self) -> QHIter<'a,KT,VT> {
    QHIter { slots : &self.slots, index : 0 }
  }

  pub fn keys<'a>(&'a self) -> impl Iterator<Item = &'a KT> + 'a {
    self.iter().map(|(k,_)|k)
  }

  pub fn values<'a>(&'a self) -> impl Iterator<Item = &'a VT> + 'a {
    self.iter().map(|(_,v)|v)
  }
}// impl QuadHashTable

/// The empty, zero-capacity table left behind by [QuadHashTable::take].
impl<KT,VT> Default for QuadHashTable<KT,VT> {
  fn default() -> Self {
    QuadHashTable {
      slots : Vec::new(),
      maxload : DEFAULTLOAD,
      threshold : 0,
      keycount : 0,
      usedbuckets : 0,
      userhash : None,
      autostate : RandomState::new(),
    }
  }
}// impl default

/// indexed get, unwraps
impl<KT:Hash+Eq, VT> core::ops::Index<&KT> for QuadHashTable<KT,VT>
{
  type Output = VT;
  fn index(&self, key:&KT) -> &Self::Output {
    self.get(key).expect("key not found")
  }
}

/// Iterator for the [QuadHashTable::iter] function
pub struct QHIter<'a,KT,VT> {
  slots : &'a [Slot<KT,VT>],
  index : usize,
}
impl<'a,KT,VT> Iterator for QHIter<'a,KT,VT> {
  type Item = (&'a KT, &'a VT);
  fn next(&mut self) -> Option<Self::Item> {
    while self.index < self.slots.len() {
      self.index += 1;
      if let Slot::Filled(k,v) = &self.slots[self.index-1] {return Some((k,v));}
    }
    None
  }//next
}// QHIter

impl<'a,KT:Hash+Eq, VT> IntoIterator for &'a QuadHashTable<KT,VT> {
  type Item = (&'a KT, &'a VT);
  type IntoIter = QHIter<'a,KT,VT>;
  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  fn zero_hash(_:&i32) -> usize { 0 }

  fn count(t:&QuadHashTable<i32,&'static str>) -> (usize,usize) {
    let filled = t.slots.iter().filter(|s| matches!(s, Slot::Filled(..))).count();
    let tombs = t.slots.iter().filter(|s| matches!(s, Slot::Tombstone)).count();
    (filled, tombs)
  }

  #[test]
  fn probe_visits_every_slot() {
    for p in 3..12 {
      let cap = 1usize << p;
      let seen:HashSet<usize> = (0..cap).map(|x| quadratic_probe(x) % cap).collect();
      assert_eq!(seen.len(), cap, "capacity {}", cap);
    }
  }

  #[test]
  fn probe_values() {
    let ps:Vec<usize> = (0..6).map(quadratic_probe).collect();
    assert_eq!(ps, vec![0,1,3,6,10,15]);
  }

  #[test]
  fn capacity_rounding_and_load_clamp() {
    let t = QuadHashTable::<i32,i32>::with_capacity(0, 0.0);
    assert_eq!(t.capacity(), DEFAULTCAP);
    assert_eq!(t.maxload, DEFAULTLOAD);
    let t = QuadHashTable::<i32,i32>::with_capacity(100, f64::NAN);
    assert_eq!(t.capacity(), 128);
    assert_eq!(t.maxload, DEFAULTLOAD);
    let t = QuadHashTable::<i32,i32>::with_capacity(17, f64::INFINITY);
    assert_eq!(t.capacity(), 32);
    assert_eq!(t.maxload, MAXLOAD);
    assert!(t.threshold < t.capacity());
  }

  #[test]
  fn tiny_load_factor_is_raised() {
    let mut t = QuadHashTable::with_capacity(8, 1e-12);
    assert_eq!(t.maxload, MINLOAD);
    t.insert(1u32, 1u32);
    assert!(t.capacity() <= 16, "capacity {}", t.capacity());
    let mut t = QuadHashTable::with_capacity(8, 1e-7);
    for k in 0..4u32 { t.insert(k, k); }
    assert!(t.capacity() <= 64, "capacity {}", t.capacity());
    assert_eq!(t.size(), 4);
  }

  #[test]
  fn capacity_never_overflows() {
    assert_eq!(table_capacity(0), DEFAULTCAP);
    assert_eq!(table_capacity(9), 16);
    assert_eq!(table_capacity(MAXCAP), MAXCAP);
    assert_eq!(table_capacity(MAXCAP + 1), MAXCAP);
    assert_eq!(table_capacity(usize::MAX), MAXCAP);
    assert!(table_capacity(usize::MAX).is_power_of_two());
  }

  #[test]
  fn normalise_masks_sign_bit() {
    let t = QuadHashTable::<i32,i32>::new();
    assert_eq!(t.normalise_index(usize::MAX), 7);
    assert_eq!(t.normalise_index(SIGNBIT | 5), 5);
  }

  #[test]
  fn colliding_keys_follow_triangular_sequence() {
    let mut t = QuadHashTable::with_capacity(8, 0.65);
    assert!(t.set_hash(zero_hash));
    for k in 1..=5 { assert_eq!(t.insert(k, "v"), None); }
    // threshold is 5, no resize yet
    assert_eq!(t.capacity(), 8);
    for (k,slot) in [(1,0),(2,1),(3,3),(4,6),(5,2)] {
      assert_eq!(t.slots[slot], Slot::Filled(k,"v"));
    }
    assert!(!t.set_hash(zero_hash));
  }

  #[test]
  fn tombstone_accounting() {
    let mut t = QuadHashTable::with_capacity(8, 0.65);
    t.set_hash(zero_hash);
    for k in 1..=5 { t.insert(k, "v"); }
    assert_eq!(t.remove(&2), Some("v"));
    assert_eq!(t.slots[1], Slot::Tombstone);
    assert_eq!((t.size(), t.used_buckets()), (4, 5));
    assert_eq!(t.remove(&2), None);
    assert_eq!(t.get(&3), Some(&"v"));

    // reusing the tombstone does not consume a bucket
    assert_eq!(t.insert(6, "six"), None);
    assert_eq!(t.slots[1], Slot::Filled(6,"six"));
    assert_eq!((t.size(), t.used_buckets()), (5, 5));
    assert_eq!(count(&t), (5, 0));
  }

  #[test]
  fn update_relocates_into_earlier_tombstone() {
    let mut t = QuadHashTable::with_capacity(8, 0.65);
    t.set_hash(zero_hash);
    for k in 1..=5 { t.insert(k, "v"); }
    t.remove(&1);
    assert_eq!(t.insert(3, "three"), Some("v"));
    assert_eq!(t.slots[0], Slot::Filled(3,"three"));
    assert_eq!(t.slots[3], Slot::Tombstone);
    assert_eq!((t.size(), t.used_buckets()), (4, 5));
    assert_eq!(t.get(&3), Some(&"three"));
  }

  #[test]
  fn resize_drops_tombstones() {
    let mut t = QuadHashTable::with_capacity(8, 0.65);
    t.set_hash(zero_hash);
    for k in 1..=5 { t.insert(k, "v"); }
    t.remove(&2);
    t.insert(7, "v");   // reuses tombstone
    assert_eq!(t.capacity(), 8);
    t.remove(&4);
    t.insert(8, "v");
    t.insert(9, "v");   // sixth used bucket
    assert_eq!(t.capacity(), 16);
    assert_eq!(t.used_buckets(), t.size());
    assert_eq!(count(&t), (6, 0));
    for k in [1,3,5,7,8,9] { assert!(t.has_key(&k), "key {}", k); }
    for k in [2,4] { assert!(!t.has_key(&k)); }
  }

  #[test]
  fn refresh_keeps_capacity() {
    let mut t = QuadHashTable::new();
    for k in 0..5 { t.insert(k, "v"); }
    for k in 0..3 { t.remove(&k); }
    assert_eq!(t.used_buckets(), 5);
    t.refresh();
    assert_eq!(t.capacity(), 8);
    assert_eq!(t.used_buckets(), 2);
    assert_eq!(count(&t), (2, 0));
    assert!(t.has_key(&3) && t.has_key(&4));
  }

  #[test]
  fn tiny_load_factor_still_terminates() {
    let mut t = QuadHashTable::with_capacity(8, 0.01);
    for k in 0..50 { t.insert(k, "v"); }
    assert!(t.used_buckets() <= t.threshold);
    assert!(t.capacity().is_power_of_two());
    assert_eq!(t.size(), 50);
  }

  #[test]
  fn insert_after_take_reallocates() {
    let mut t = QuadHashTable::new();
    t.insert(1, "one");
    let moved = t.take();
    assert_eq!(t.capacity(), 0);
    assert_eq!(t.get(&1), None);
    assert_eq!(t.remove(&1), None);
    t.insert(2, "two");
    assert_eq!(t.capacity(), DEFAULTCAP);
    assert_eq!(moved[&1], "one");
  }
}
