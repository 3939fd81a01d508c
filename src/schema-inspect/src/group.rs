// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Grouping of catalog rows by object identity.
//!
//! Catalog queries return one row per member of an object (a column of a
//! relation, a parameter of a function), repeating the object-level fields on
//! each. [`GroupContiguous::group_contiguous`] folds runs of rows sharing an
//! identity key into one group per object.
//!
//! Rows of the same object must be contiguous in the input. Queries guarantee
//! this by ordering on the identity key; the grouper does not re-sort, and an
//! object whose rows are interleaved with another's is split into several
//! groups.

use std::fmt;
use std::iter::Peekable;

/// Lazily groups contiguous items sharing a key.
///
/// Yields `(key, items)` pairs in order of first occurrence.
pub struct Grouped<I: Iterator, F> {
    iter: Peekable<I>,
    key: F,
}

impl<I, F> fmt::Debug for Grouped<I, F>
where
    I: Iterator + fmt::Debug,
    I::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grouped")
            .field("iter", &self.iter)
            .finish_non_exhaustive()
    }
}

impl<I, K, F> Iterator for Grouped<I, F>
where
    I: Iterator,
    F: FnMut(&I::Item) -> K,
    K: PartialEq,
{
    type Item = (K, Vec<I::Item>);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.iter.next()?;
        let key = (self.key)(&first);
        let mut items = vec![first];
        while let Some(item) = self.iter.next_if(|item| (self.key)(item) == key) {
            items.push(item);
        }
        Some((key, items))
    }
}

pub trait GroupContiguous: Iterator + Sized {
    /// Groups runs of contiguous items for which `key` returns equal values.
    fn group_contiguous<K, F>(self, key: F) -> Grouped<Self, F>
    where
        F: FnMut(&Self::Item) -> K,
        K: PartialEq,
    {
        Grouped {
            iter: self.peekable(),
            key,
        }
    }
}

impl<I: Iterator> GroupContiguous for I {}
