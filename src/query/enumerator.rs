//! Lazy feature enumeration.
//!
//! A [`FeatureEnumerator`] is a finite iterator over borrowed features.
//! Composites are assembled with a [`CompositeEnumerator`] builder; once the
//! builder is turned into an enumerator no handle remains that can add
//! children, so a sequence cannot grow while it is being walked.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;

use crate::feature::Feature;

type BoxedIter<'a> = Box<dyn Iterator<Item = &'a Feature> + 'a>;
type DeferredFn<'a> = Box<dyn FnOnce() -> FeatureEnumerator<'a> + 'a>;

enum Source<'a> {
    Ready(BoxedIter<'a>),
    Deferred(DeferredFn<'a>),
}

// ---------------------------------------------------------------------------
// FeatureEnumerator
// ---------------------------------------------------------------------------

/// A lazy, finite sequence of features.
///
/// Children are drained in registration order. A deferred child is not
/// constructed until every child before it has been exhausted.
pub struct FeatureEnumerator<'a> {
    current: Option<BoxedIter<'a>>,
    pending: VecDeque<Source<'a>>,
}

impl<'a> FeatureEnumerator<'a> {
    /// An enumerator that yields nothing.
    pub fn empty() -> Self {
        Self {
            current: None,
            pending: VecDeque::new(),
        }
    }

    /// Wrap any iterator of borrowed features.
    pub fn new(iter: impl Iterator<Item = &'a Feature> + 'a) -> Self {
        Self {
            current: Some(Box::new(iter)),
            pending: VecDeque::new(),
        }
    }

    /// Start building a composite.
    pub fn composite() -> CompositeEnumerator<'a> {
        CompositeEnumerator::new()
    }
}

impl<'a> Iterator for FeatureEnumerator<'a> {
    type Item = &'a Feature;

    fn next(&mut self) -> Option<&'a Feature> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(feature) = current.next() {
                    return Some(feature);
                }
                self.current = None;
            }
            match self.pending.pop_front()? {
                Source::Ready(iter) => self.current = Some(iter),
                Source::Deferred(make) => self.current = Some(Box::new(make())),
            }
        }
    }
}

impl FusedIterator for FeatureEnumerator<'_> {}

impl Default for FeatureEnumerator<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for FeatureEnumerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureEnumerator")
            .field("started", &self.current.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CompositeEnumerator
// ---------------------------------------------------------------------------

/// Builder for a union of child enumerators.
#[derive(Default)]
pub struct CompositeEnumerator<'a> {
    sources: VecDeque<Source<'a>>,
}

impl<'a> CompositeEnumerator<'a> {
    pub fn new() -> Self {
        Self {
            sources: VecDeque::new(),
        }
    }

    /// Append an already constructed child.
    pub fn add_enumerator(&mut self, child: FeatureEnumerator<'a>) -> &mut Self {
        self.sources.push_back(Source::Ready(Box::new(child)));
        self
    }

    /// Append a child whose construction waits until enumeration reaches it.
    pub fn add_deferred(&mut self, make: impl FnOnce() -> FeatureEnumerator<'a> + 'a) -> &mut Self {
        self.sources.push_back(Source::Deferred(Box::new(make)));
        self
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Finish building. No further children can be added.
    pub fn build(self) -> FeatureEnumerator<'a> {
        FeatureEnumerator {
            current: None,
            pending: self.sources,
        }
    }
}

impl<'a> IntoIterator for CompositeEnumerator<'a> {
    type Item = &'a Feature;
    type IntoIter = FeatureEnumerator<'a>;

    fn into_iter(self) -> FeatureEnumerator<'a> {
        self.build()
    }
}

impl fmt::Debug for CompositeEnumerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeEnumerator")
            .field("children", &self.sources.len())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
