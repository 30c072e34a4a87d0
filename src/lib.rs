//! This crate provides two containers built over flat arrays whose
//! structural invariants are maintained under logarithmic-time mutation.
//!
//! An ***IndexedPQ*** is a d-ary min-heap whose elements are addressed by
//! small integer *key indices* in `[0, capacity)` chosen by the caller.
//! An ordinary binary heap can only find an element by scanning, so
//! changing the priority of an arbitrary element costs O(n).  Here, a
//! *position map* (key index to heap position) and an *inverse map* (heap
//! position to key index) are kept consistent on every swap, so that any
//! key can be located in O(1) and re-prioritized, removed or tested for
//! membership in O(log n) or better.  Values are stored by key index and
//! never move; heap operations only permute the two maps.  This is the
//! structure used by Dijkstra- and Prim-style algorithms, which rely on
//! [IndexedPQ::decrease] silently ignoring non-improvements.
//!
//! The module [quadhash] contains [QuadHashTable], an open-addressed hash
//! map with quadratic probing over a power-of-two table, tombstones for
//! deletion, and compaction on resize.
//!
//! Neither structure is thread-safe.  Deep copies are made with `Clone`;
//! `take` moves the contents out and leaves an empty, zero-capacity
//! structure behind.

#![allow(non_snake_case)]
#![allow(unused_parens)]

pub mod error;
pub mod quadhash;

pub use error::{QueueError, Result};
pub use quadhash::{QuadHashTable, Slot};

use tracing::{debug, trace};

/// heap degree used when the requested degree is less than 2
pub const DEFAULTDEGREE:usize = 2;
/// capacity used when the requested capacity is 0
pub const DEFAULTCAP:usize = 16;
/// marks an unused entry of the position or inverse map
pub const NOPOS:usize = usize::MAX;

/// Indexed priority queue (min-heap) of fixed capacity and arbitrary degree.
///
/// Key indices are plain integers in `[0, capacity)`.  The capacity is set
/// at construction and never changes.  Operations differ in how they treat
/// a key that is absent or out of range, and the difference is deliberate:
///
/// | operation | out of range | absent |
/// |---|---|---|
/// | [contains](Self::contains) | `Err(KeyOutOfBounds)` | `Ok(false)` |
/// | [insert](Self::insert) | `Err(KeyOutOfBounds)` | inserts |
/// | [value_of](Self::value_of) | `Err(KeyOutOfBounds)` | `Err(KeyNotFound)` |
/// | [remove_key](Self::remove_key), [update](Self::update) | `None` | `None` |
/// | [decrease](Self::decrease), [increase](Self::increase) | `false` | `false` |
///
/// [peek_min_key_index](Self::peek_min_key_index) and
/// [poll_min_key_index](Self::poll_min_key_index) fail with `QueueEmpty`
/// on an empty queue, whereas [peek_min_value](Self::peek_min_value) and
/// [poll_min_value](Self::poll_min_value) return `None`.
#[derive(Clone, Debug)]
pub struct IndexedPQ<VT>
{
  degree : usize,
  size : usize,
  pm : Vec<usize>,         // key index -> heap position
  im : Vec<usize>,         // heap position -> key index
  vals : Vec<Option<VT>>,  // by key index, Some iff present
  parent : Vec<usize>,
  child : Vec<usize>,      // first child
}
impl<VT:Ord> IndexedPQ<VT>
{
  /// creates an IndexedPQ of the given degree that holds key indices
  /// `0..maxnodes`.  A degree less than 2 defaults to 2 and a capacity of
  /// 0 defaults to 16.
  pub fn with_degree(mut degree:usize, mut maxnodes:usize) -> Self {
    if degree < 2 {
      debug!(requested = degree, fallback = DEFAULTDEGREE, "heap degree too small, using default");
      degree = DEFAULTDEGREE;
    }
    if maxnodes < 1 {
      debug!(fallback = DEFAULTCAP, "zero queue capacity requested, using default");
      maxnodes = DEFAULTCAP;
    }
    let mut vals = Vec::with_capacity(maxnodes);
    vals.resize_with(maxnodes, ||None);
    IndexedPQ {
      degree,
      size : 0,
      pm : vec![NOPOS; maxnodes],
      im : vec![NOPOS; maxnodes],
      vals,
      parent : (0..maxnodes).map(|p| if p>0 {(p-1)/degree} else {0}).collect(),
      child : (0..maxnodes).map(|p| p.saturating_mul(degree).saturating_add(1)).collect(),
    }
  }//with_degree

  /// creates a binary (degree 2) IndexedPQ for key indices `0..maxnodes`
  pub fn new(maxnodes:usize) -> Self { Self::with_degree(DEFAULTDEGREE, maxnodes) }

  pub fn size(&self) -> usize { self.size }
  pub fn is_empty(&self) -> bool { self.size == 0 }

  /// number of key indices this queue can hold, fixed at construction
  pub fn capacity(&self) -> usize { self.pm.len() }

  pub fn degree(&self) -> usize { self.degree }

  fn check_bounds(&self, ki:usize) -> Result<()> {
    if ki >= self.capacity() {
      Err(QueueError::KeyOutOfBounds { ki, capacity: self.capacity() })
    }
    else {Ok(())}
  }

  // soft membership test, out of range is simply absent
  fn present(&self, ki:usize) -> bool {
    ki < self.pm.len() && self.pm[ki] != NOPOS
  }

  /// Determines if the key index is in the queue.  A key index outside
  /// `[0, capacity)` is an error rather than `false`.  O(1).
  pub fn contains(&self, ki:usize) -> Result<bool> {
    self.check_bounds(ki)?;
    Ok(self.pm[ki] != NOPOS)
  }

  /// returns the value associated with a key index that must be present
  pub fn value_of(&self, ki:usize) -> Result<&VT> {
    self.check_bounds(ki)?;
    self.vals[ki].as_ref().ok_or(QueueError::KeyNotFound { ki })
  }

  /// key index with the smallest value.  O(1).
  pub fn peek_min_key_index(&self) -> Result<usize> {
    if self.size == 0 {Err(QueueError::QueueEmpty)}
    else {Ok(self.im[0])}
  }

  /// Removes the entry with the smallest value and returns its key index.
  /// O(log n).
  pub fn poll_min_key_index(&mut self) -> Result<usize> {
    let ki = self.peek_min_key_index()?;
    self.remove_key(ki);
    Ok(ki)
  }

  /// smallest value, or None if the queue is empty.  O(1).
  pub fn peek_min_value(&self) -> Option<&VT> {
    if self.size == 0 {None}
    else {self.vals[self.im[0]].as_ref()}
  }

  /// Removes and returns the smallest value, or None if the queue is
  /// empty.  O(log n).
  pub fn poll_min_value(&mut self) -> Option<VT> {
    self.poll().map(|(_,v)|v)
  }

  /// returns the key index and value of the minimum entry
  pub fn peek(&self) -> Option<(usize,&VT)> {
    if self.size == 0 {return None;}
    let ki = self.im[0];
    self.vals[ki].as_ref().map(|v|(ki,v))
  }

  /// removes and returns the key index and value of the minimum entry
  pub fn poll(&mut self) -> Option<(usize,VT)> {
    if self.size == 0 {return None;}
    let ki = self.im[0];
    self.remove_key(ki).map(|v|(ki,v))
  }

  /// Inserts a value under a key index not currently in the queue.
  /// Fails with `DuplicateKey` if the key index is present and with
  /// `KeyOutOfBounds` if it exceeds the capacity.  O(log n).
  pub fn insert(&mut self, ki:usize, val:VT) -> Result<()> {
    if self.contains(ki)? {
      return Err(QueueError::DuplicateKey { ki });
    }
    let pos = self.size;
    self.pm[ki] = pos;
    self.im[pos] = ki;
    self.vals[ki] = Some(val);
    self.size += 1;
    self.swim(pos);
    trace!(ki, size = self.size, "inserted key index");
    Ok(())
  }//insert

  /// Removes the key index and returns its value.  None is returned if
  /// the key index is absent or out of range.  O(log n).
  pub fn remove_key(&mut self, ki:usize) -> Option<VT> {
    if !self.present(ki) {return None;}
    let i = self.pm[ki];
    self.size -= 1;
    self.swap(i, self.size);
    if i < self.size {
      // displaced node may belong above or below
      self.sink(i);
      self.swim(i);
    }
    self.pm[ki] = NOPOS;
    self.im[self.size] = NOPOS;
    trace!(ki, size = self.size, "removed key index");
    self.vals[ki].take()
  }//remove_key

  /// Replaces the value of a present key index, returning the old value,
  /// or None if the key index is absent or out of range.  O(log n).
  pub fn update(&mut self, ki:usize, val:VT) -> Option<VT> {
    if !self.present(ki) {return None;}
    let old = self.vals[ki].replace(val);
    let i = self.pm[ki];
    self.sink(i);
    self.swim(i);
    old
  }//update

  /// Lowers the value of a key index.  Nothing happens unless the key
  /// index is present and `val` is strictly less than its current value.
  /// Returns true if the value was changed.  O(log n).
  pub fn decrease(&mut self, ki:usize, val:VT) -> bool {
    if !self.present(ki) || !self.vals[ki].as_ref().is_some_and(|cur| val < *cur) {
      return false;
    }
    self.vals[ki] = Some(val);
    self.swim(self.pm[ki]);
    true
  }//decrease

  /// Raises the value of a key index.  Nothing happens unless the key
  /// index is present and `val` is strictly greater than its current
  /// value.  Returns true if the value was changed.  O(log n).
  pub fn increase(&mut self, ki:usize, val:VT) -> bool {
    if !self.present(ki) || !self.vals[ki].as_ref().is_some_and(|cur| val > *cur) {
      return false;
    }
    self.vals[ki] = Some(val);
    self.sink(self.pm[ki]);
    true
  }//increase

  /// removes every entry, keeping the capacity and degree
  pub fn clear(&mut self) {
    for p in 0..self.size {
      let ki = self.im[p];
      self.pm[ki] = NOPOS;
      self.vals[ki] = None;
      self.im[p] = NOPOS;
    }
    debug!(removed = self.size, "cleared indexed priority queue");
    self.size = 0;
  }//clear

  /// Moves the contents out, leaving this queue empty with capacity 0.
  pub fn take(&mut self) -> Self {
    core::mem::take(self)
  }

  // compares values at heap positions i and j
  fn less(&self, i:usize, j:usize) -> bool {
    match (&self.vals[self.im[i]], &self.vals[self.im[j]]) {
      (Some(a), Some(b)) => a < b,
      _ => false,
    }
  }

  // only the maps change, values stay indexed by key index
  fn swap(&mut self, i:usize, j:usize) {
    if i == j {return;}
    self.pm[self.im[j]] = i;
    self.pm[self.im[i]] = j;
    self.im.swap(i,j);
  }//swap

  fn swim(&mut self, mut i:usize) -> usize {
    while (i>0 && self.less(i, self.parent[i])) {
      let p = self.parent[i];
      self.swap(i,p);
      i = p;
    }
    i
  }//swim returns final position

  fn sink(&mut self, mut i:usize) -> usize {
    while let Some(c) = self.min_child(i) {
      if !self.less(c,i) {break;}
      self.swap(i,c);
      i = c;
    }
    i
  }//sink returns final position

  // position of the smallest of up to `degree` children, None for a leaf
  fn min_child(&self, i:usize) -> Option<usize> {
    let first = self.child[i];
    if first >= self.size {return None;}
    let end = first.saturating_add(self.degree).min(self.size);
    let mut best = first;
    for c in (first+1)..end {
      if self.less(c,best) {best = c;}
    }
    Some(best)
  }//min_child

  /// Snapshot of the internal index arrays, for inspection and debugging.
  pub fn arrays(&self) -> HeapArrays {
    HeapArrays {
      size : self.size,
      degree : self.degree,
      position_map : self.pm.clone(),
      inverse_map : self.im.clone(),
      parent : self.parent.clone(),
      child : self.child.clone(),
    }
  }

  /// returns an iterator over `(key index, value)` pairs in heap-array
  /// order, which is not priority order
  pub fn iter<'a>(&'a self) -> PQIter<'a,VT> {
    PQIter { pq : self, index : 0 }
  }

  /// Returns a consuming iterator over entries in priority order,
  /// equivalent to repeatedly calling [poll](Self::poll).  The queue is
  /// empty once the iterator is exhausted.
  pub fn priority_stream<'a>(&'a mut self) -> PriorityStream<'a,VT> {
    PriorityStream(self)
  }
}// impl IndexedPQ

/// The empty, zero-capacity queue left behind by [IndexedPQ::take].
impl<VT> Default for IndexedPQ<VT> {
  fn default() -> Self {
    IndexedPQ {
      degree : DEFAULTDEGREE,
      size : 0,
      pm : Vec::new(),
      im : Vec::new(),
      vals : Vec::new(),
      parent : Vec::new(),
      child : Vec::new(),
    }
  }
}// impl default

/// indexed get by key index, panics if the key index is not present
impl<VT:Ord> core::ops::Index<usize> for IndexedPQ<VT>
{
  type Output = VT;
  fn index(&self, ki:usize) -> &Self::Output {
    match self.value_of(ki) {
      Ok(v) => v,
      Err(e) => panic!("{}", e),
    }
  }
} //impl Index

/// Copy of the position map, inverse map and topology tables of an
/// [IndexedPQ], returned by [IndexedPQ::arrays].  Unused entries hold
/// [NOPOS].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapArrays {
  pub size : usize,
  pub degree : usize,
  pub position_map : Vec<usize>,
  pub inverse_map : Vec<usize>,
  pub parent : Vec<usize>,
  pub child : Vec<usize>,
}

/////////////////// iterators

/// Iterator for the [IndexedPQ::iter] function
pub struct PQIter<'a,VT> {
  pq : &'a IndexedPQ<VT>,
  index : usize,
}
impl<'a,VT> Iterator for PQIter<'a,VT> {
  type Item = (usize, &'a VT);
  fn next(&mut self) -> Option<Self::Item> {
    while self.index < self.pq.size {
      let ki = self.pq.im[self.index];
      self.index += 1;
      if let Some(v) = &self.pq.vals[ki] {return Some((ki,v));}
    }
    None
  }//next
}// PQIter

impl<'a,VT:Ord> IntoIterator for &'a IndexedPQ<VT> {
  type Item = (usize, &'a VT);
  type IntoIter = PQIter<'a,VT>;
  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

/// Iterator for the [IndexedPQ::priority_stream] function
pub struct PriorityStream<'a,VT>(&'a mut IndexedPQ<VT>);
impl<'a,VT:Ord> Iterator for PriorityStream<'a,VT> {
  type Item = (usize,VT);
  fn next(&mut self) -> Option<Self::Item> {
    self.0.poll()
  }
}

impl<'a,VT:Ord> IntoIterator for &'a mut IndexedPQ<VT> {
  type Item = (usize,VT);
  type IntoIter = PriorityStream<'a,VT>;
  fn into_iter(self) -> Self::IntoIter {
    PriorityStream(self)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn check_invariants<VT:Ord>(pq:&IndexedPQ<VT>) {
    for p in 0..pq.size {
      let ki = pq.im[p];
      assert_eq!(pq.pm[ki], p, "pm[im[{}]]", p);
      assert!(pq.vals[ki].is_some());
      let first = pq.child[p];
      for c in first..(first+pq.degree).min(pq.size) {
        assert!(pq.vals[ki] <= pq.vals[pq.im[c]], "heap order at {} -> {}", p, c);
      }
    }
    for p in pq.size..pq.capacity() {
      assert_eq!(pq.im[p], NOPOS);
    }
    let present = (0..pq.capacity()).filter(|&k| pq.pm[k] != NOPOS).count();
    assert_eq!(present, pq.size);
  }

  #[test]
  fn topology_tables() {
    let pq = IndexedPQ::<i32>::with_degree(3, 10);
    assert_eq!(pq.parent[0], 0);
    assert_eq!(pq.parent[1], 0);
    assert_eq!(pq.parent[3], 0);
    assert_eq!(pq.parent[4], 1);
    assert_eq!(pq.parent[9], 2);
    assert_eq!(pq.child[0], 1);
    assert_eq!(pq.child[2], 7);
  }

  #[test]
  fn constructor_defaults() {
    let pq = IndexedPQ::<i32>::with_degree(1, 0);
    assert_eq!(pq.degree(), DEFAULTDEGREE);
    assert_eq!(pq.capacity(), DEFAULTCAP);
    let pq = IndexedPQ::<i32>::with_degree(0, 5);
    assert_eq!(pq.degree(), DEFAULTDEGREE);
    assert_eq!(pq.capacity(), 5);
  }

  #[test]
  fn invariants_hold_for_several_degrees() {
    for d in 2..6 {
      let mut pq = IndexedPQ::with_degree(d, 40);
      for k in 0..40usize {
        pq.insert(k, ((k * 17) % 23) as i64).unwrap();
        check_invariants(&pq);
      }
      for k in (0..40usize).step_by(3) {
        pq.remove_key(k);
        check_invariants(&pq);
      }
      for k in (1..40usize).step_by(4) {
        pq.update(k, 100 - k as i64);
        check_invariants(&pq);
        pq.decrease(k, -(k as i64));
        check_invariants(&pq);
      }
      let mut last = i64::MIN;
      while let Some(v) = pq.poll_min_value() {
        assert!(v >= last);
        last = v;
        check_invariants(&pq);
      }
    }
  }

  #[test]
  fn removing_last_position() {
    let mut pq = IndexedPQ::new(4);
    pq.insert(0, 1).unwrap();
    pq.insert(1, 5).unwrap();
    pq.insert(2, 2).unwrap();
    // key 2 sits at the last position
    assert_eq!(pq.pm[2], 2);
    assert_eq!(pq.remove_key(2), Some(2));
    check_invariants(&pq);
    assert_eq!(pq.im[2], NOPOS);
    assert_eq!(pq.peek(), Some((0,&1)));
  }

  #[test]
  fn min_child_bounded_by_size() {
    let mut pq = IndexedPQ::with_degree(4, 8);
    for (k,v) in [(0,1),(1,9),(2,3)] { pq.insert(k,v).unwrap(); }
    assert_eq!(pq.min_child(0), Some(2));
    assert_eq!(pq.min_child(1), None);
  }

  #[test]
  fn clear_resets_maps() {
    let mut pq = IndexedPQ::new(6);
    for k in 0..6 { pq.insert(k, k as i32).unwrap(); }
    pq.clear();
    assert!(pq.is_empty());
    assert!(pq.pm.iter().all(|&p| p == NOPOS));
    assert!(pq.vals.iter().all(|v| v.is_none()));
    pq.insert(3, 7).unwrap();
    check_invariants(&pq);
  }

  #[test]
  fn out_of_range_policies() {
    let mut pq = IndexedPQ::new(3);
    pq.insert(0, 10).unwrap();
    assert_eq!(pq.contains(3), Err(QueueError::KeyOutOfBounds { ki: 3, capacity: 3 }));
    assert_eq!(pq.insert(7, 1), Err(QueueError::KeyOutOfBounds { ki: 7, capacity: 3 }));
    assert_eq!(pq.value_of(1), Err(QueueError::KeyNotFound { ki: 1 }));
    assert_eq!(pq.remove_key(3), None);
    assert_eq!(pq.update(9, 1), None);
    assert!(!pq.decrease(9, 1));
    assert!(!pq.increase(9, 100));
    assert_eq!(pq[0], 10);
  }
}
