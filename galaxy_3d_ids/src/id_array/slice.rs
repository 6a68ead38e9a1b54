//! Append-only chain of fixed-size slot slices.
//!
//! A slice is linked exactly once through its write-once `next` cell and
//! never moved afterwards, so readers can walk the chain without a lock
//! while a writer appends to the tail. Only `&mut` access (clean, drop)
//! can unlink slices.

use std::iter;
use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::OnceLock;
use crate::error::{Galaxy3dError, Galaxy3dResult};
use super::Id;

pub(crate) struct Slice<T> {
    slots: Box<[AtomicPtr<T>]>,
    next: OnceLock<Box<Slice<T>>>,
}

impl<T> Slice<T> {
    /// Allocate a slice of `len` free slots, failing instead of aborting
    pub(crate) fn try_new(len: usize) -> Galaxy3dResult<Box<Self>> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|_| Galaxy3dError::OutOfMemory)?;
        slots.extend((0..len).map(|_| AtomicPtr::new(ptr::null_mut())));
        Ok(Box::new(Self {
            slots: slots.into_boxed_slice(),
            next: OnceLock::new(),
        }))
    }

    pub(crate) fn next(&self) -> Option<&Slice<T>> {
        self.next.get().map(|next| &**next)
    }
}

impl<T> Drop for Slice<T> {
    // Unlink iteratively: a long chain would otherwise drop recursively
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut slice) = next {
            next = slice.next.take();
        }
    }
}

pub(crate) struct SliceChain<T> {
    head: OnceLock<Box<Slice<T>>>,
    slice_len: usize,
}

impl<T> SliceChain<T> {
    pub(crate) fn new(slice_len: usize) -> Self {
        Self {
            head: OnceLock::new(),
            slice_len,
        }
    }

    pub(crate) fn slice_len(&self) -> usize {
        self.slice_len
    }

    /// Slices in link order
    pub(crate) fn slices(&self) -> impl Iterator<Item = &Slice<T>> + '_ {
        iter::successors(self.head.get().map(|head| &**head), |slice| slice.next())
    }

    /// Slot backing `id`, reached by `id / slice_len` hops
    pub(crate) fn slot(&self, id: Id) -> Option<&AtomicPtr<T>> {
        let index = id as usize;
        self.slices()
            .nth(index / self.slice_len)?
            .slots
            .get(index % self.slice_len)
    }

    /// Slots from `start` onwards, paired with their IDs
    pub(crate) fn slots_from(&self, start: Id) -> impl Iterator<Item = (Id, &AtomicPtr<T>)> + '_ {
        let slice_len = self.slice_len;
        let start = start as usize;
        self.slices()
            .enumerate()
            .skip(start / slice_len)
            .flat_map(move |(index, slice)| {
                slice
                    .slots
                    .iter()
                    .enumerate()
                    .map(move |(offset, slot)| ((index * slice_len + offset) as Id, slot))
            })
            .skip(start % slice_len)
    }

    /// Link `slice` after the current tail
    ///
    /// Callers serialize appends; returns false if the tail was linked
    /// behind their back.
    pub(crate) fn append(&self, slice: Box<Slice<T>>) -> bool {
        match self.slices().last() {
            None => self.head.set(slice).is_ok(),
            Some(tail) => tail.next.set(slice).is_ok(),
        }
    }

    /// Keep the first `keep` slices and free the rest
    pub(crate) fn truncate(&mut self, keep: usize) {
        if keep == 0 {
            self.clear();
            return;
        }
        let Some(mut slice) = self.head.get_mut() else {
            return;
        };
        for _ in 1..keep {
            match slice.next.get_mut() {
                Some(next) => slice = next,
                None => return,
            }
        }
        drop(slice.next.take());
    }

    /// Free every slice
    pub(crate) fn clear(&mut self) {
        drop(self.head.take());
    }
}
