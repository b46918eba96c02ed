//! The ordered set of live selectors targeting one module.

use std::cmp::Ordering;

use trellis_core::selector::{VersionConstraint, VersionSelector};
use trellis_core::version::{Version, VersionOrder};

use crate::latch::Latch;

/// The parts of a selector that decide its priority.
pub trait ResolvableSelector {
    fn is_project(&self) -> bool;
    fn is_from_lock(&self) -> bool;
    fn is_force(&self) -> bool;
    fn version_constraint(&self) -> Option<&VersionConstraint>;
}

/// Maps the keys stored in a [`ModuleSelectors`] back to selectors.
pub trait SelectorLookup<K> {
    type Selector: ResolvableSelector;

    fn selector(&self, key: K) -> &Self::Selector;
}

impl<S: ResolvableSelector> SelectorLookup<usize> for [S] {
    type Selector = S;

    fn selector(&self, key: usize) -> &S {
        &self[key]
    }
}

fn required(s: &impl ResolvableSelector) -> Option<&VersionSelector> {
    s.version_constraint().and_then(|c| c.required.as_ref())
}

fn is_latest(s: &impl ResolvableSelector) -> bool {
    required(s).is_some_and(VersionSelector::is_latest)
}

fn is_dynamic(s: &impl ResolvableSelector) -> bool {
    required(s).is_some_and(VersionSelector::is_dynamic)
}

fn required_exact(s: &impl ResolvableSelector) -> Option<&Version> {
    s.version_constraint().and_then(VersionConstraint::required_exact)
}

fn preferred_exact(s: &impl ResolvableSelector) -> Option<&Version> {
    s.version_constraint().and_then(VersionConstraint::preferred_exact)
}

/// `Less` means `left` is consulted before `right`.
pub fn compare_selectors<S: ResolvableSelector>(left: &S, right: &S, order: &dyn VersionOrder) -> Ordering {
    right
        .is_project()
        .cmp(&left.is_project())
        .then_with(|| right.is_from_lock().cmp(&left.is_from_lock()))
        .then_with(|| is_latest(right).cmp(&is_latest(left)))
        .then_with(|| is_dynamic(left).cmp(&is_dynamic(right)))
        .then_with(|| order.compare_optional(required_exact(right), required_exact(left)))
        .then_with(|| order.compare_optional(preferred_exact(right), preferred_exact(left)))
}

/// Selectors of one module, kept in priority order as they are added.
///
/// Equal-priority selectors keep their insertion order. Once a forced
/// selector has been added, every later addition is appended.
#[derive(Debug, Clone)]
pub struct ModuleSelectors<K> {
    selectors: Vec<K>,
    forced: Latch,
    defer_selection: bool,
}

impl<K> Default for ModuleSelectors<K> {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            forced: Latch::new(),
            defer_selection: false,
        }
    }
}

impl<K: Copy + PartialEq> ModuleSelectors<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L>(&mut self, key: K, defer_selection: bool, lookup: &L, order: &dyn VersionOrder)
    where
        L: SelectorLookup<K> + ?Sized,
    {
        debug_assert!(!self.selectors.contains(&key), "selector added twice");
        self.defer_selection = defer_selection;
        let selector = lookup.selector(key);
        if self.selectors.is_empty() || self.forced.is_set() || selector.is_force() {
            self.selectors.push(key);
        } else {
            let cmp = |probe: &K| compare_selectors(lookup.selector(*probe), selector, order);
            let mut idx = self.selectors.binary_search_by(cmp).unwrap_or_else(|i| i);
            while idx < self.selectors.len() && cmp(&self.selectors[idx]) == Ordering::Equal {
                idx += 1;
            }
            self.selectors.insert(idx, key);
        }
        self.forced.set_if(selector.is_force());
    }

    /// Returns `false` if `key` was not present.
    pub fn remove(&mut self, key: K) -> bool {
        match self.selectors.iter().position(|k| *k == key) {
            Some(idx) => {
                self.selectors.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn first(&self) -> Option<K> {
        self.selectors.first().copied()
    }

    pub fn contains(&self, key: K) -> bool {
        self.selectors.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn is_forced(&self) -> bool {
        self.forced.is_set()
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.selectors.iter().copied()
    }

    /// Take the defer flag left by the last `add`.
    pub fn check_defer_selection(&mut self) -> bool {
        std::mem::take(&mut self.defer_selection)
    }
}
