//! An ordered sequence alternating two element kinds.
//!
//! ```text
//! major₀ minor₀ major₁ minor₁ … majorₙ
//! ```
//!
//! The sequence always starts and ends with a *major* element, so
//! `majors().len() == minors().len() + 1` holds for every value.  It is
//! immutable once built; [`AlternatingBuilder`] grows it at either end.

use std::collections::VecDeque;

/// One element of an [`AlternatingSequence`], borrowed.
#[derive(Debug, PartialEq)]
pub enum Element<'a, Major, Minor> {
    Major(&'a Major),
    Minor(&'a Minor),
}

impl<Major, Minor> Clone for Element<'_, Major, Minor> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Major, Minor> Copy for Element<'_, Major, Minor> {}

/// Which kind of element comes next.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ElementKind {
    Major,
    Minor,
}

// ── AlternatingSequence ───────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Debug)]
pub struct AlternatingSequence<Major, Minor> {
    majors: Vec<Major>,
    minors: Vec<Minor>,
}

impl<Major, Minor> AlternatingSequence<Major, Minor> {
    /// A sequence holding a single major element.
    pub fn single(major: Major) -> Self {
        Self { majors: vec![major], minors: Vec::new() }
    }

    pub fn first(&self) -> &Major {
        &self.majors[0]
    }

    pub fn last(&self) -> &Major {
        &self.majors[self.majors.len() - 1]
    }

    pub fn majors(&self) -> &[Major] {
        &self.majors
    }

    pub fn minors(&self) -> &[Minor] {
        &self.minors
    }

    /// Total element count (majors + minors).
    pub fn len(&self) -> usize {
        self.majors.len() + self.minors.len()
    }

    /// Always `false`: a sequence holds at least one major.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Element at flat position `index` (even = major, odd = minor).
    pub fn get(&self, index: usize) -> Option<Element<'_, Major, Minor>> {
        if index % 2 == 0 {
            self.majors.get(index / 2).map(Element::Major)
        } else {
            self.minors.get(index / 2).map(Element::Minor)
        }
    }

    pub fn cursor(&self) -> Cursor<'_, Major, Minor> {
        Cursor { seq: self, position: 0 }
    }

    /// All elements in order.
    pub fn iter(&self) -> Cursor<'_, Major, Minor> {
        self.cursor()
    }

    /// Map both kinds into a common type, in sequence order.
    pub fn flatten<T>(
        &self,
        mut on_major: impl FnMut(&Major) -> T,
        mut on_minor: impl FnMut(&Minor) -> T,
    ) -> Vec<T> {
        self.iter()
            .map(|e| match e {
                Element::Major(m) => on_major(m),
                Element::Minor(m) => on_minor(m),
            })
            .collect()
    }

    /// Convert element-wise, preserving the alternation.
    pub fn map<A, B>(
        &self,
        on_major: impl FnMut(&Major) -> A,
        on_minor: impl FnMut(&Minor) -> B,
    ) -> AlternatingSequence<A, B> {
        AlternatingSequence {
            majors: self.majors.iter().map(on_major).collect(),
            minors: self.minors.iter().map(on_minor).collect(),
        }
    }
}

// ── Cursor ────────────────────────────────────────────────────────────────────

/// Forward-only traversal that hands out majors and minors in turn.
///
/// [`next_major`][Self::next_major] and [`next_minor`][Self::next_minor] only
/// advance when the requested kind is actually next, so callers that know the
/// shape can pull typed elements without matching.
#[derive(Debug)]
pub struct Cursor<'a, Major, Minor> {
    seq:      &'a AlternatingSequence<Major, Minor>,
    position: usize,
}

impl<'a, Major, Minor> Cursor<'a, Major, Minor> {
    /// Kind of the next element, or `None` when exhausted.
    pub fn peek_kind(&self) -> Option<ElementKind> {
        if self.position >= self.seq.len() {
            None
        } else if self.position % 2 == 0 {
            Some(ElementKind::Major)
        } else {
            Some(ElementKind::Minor)
        }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.seq.len()
    }

    pub fn next_major(&mut self) -> Option<&'a Major> {
        if self.peek_kind() != Some(ElementKind::Major) {
            return None;
        }
        let major = &self.seq.majors[self.position / 2];
        self.position += 1;
        Some(major)
    }

    pub fn next_minor(&mut self) -> Option<&'a Minor> {
        if self.peek_kind() != Some(ElementKind::Minor) {
            return None;
        }
        let minor = &self.seq.minors[self.position / 2];
        self.position += 1;
        Some(minor)
    }
}

impl<'a, Major, Minor> Iterator for Cursor<'a, Major, Minor> {
    type Item = Element<'a, Major, Minor>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.seq.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.seq.len().saturating_sub(self.position);
        (left, Some(left))
    }
}

impl<Major, Minor> ExactSizeIterator for Cursor<'_, Major, Minor> {}

// ── AlternatingBuilder ────────────────────────────────────────────────────────

/// Grows a sequence from one major element outwards.
#[derive(Debug)]
pub struct AlternatingBuilder<Major, Minor> {
    majors: VecDeque<Major>,
    minors: VecDeque<Minor>,
}

impl<Major, Minor> AlternatingBuilder<Major, Minor> {
    pub fn new(first: Major) -> Self {
        Self {
            majors: VecDeque::from([first]),
            minors: VecDeque::new(),
        }
    }

    /// Add `minor` then `major` after the current last major.
    pub fn append(&mut self, minor: Minor, major: Major) -> &mut Self {
        self.minors.push_back(minor);
        self.majors.push_back(major);
        self
    }

    /// Add `major` then `minor` before the current first major.
    pub fn prepend(&mut self, major: Major, minor: Minor) -> &mut Self {
        self.majors.push_front(major);
        self.minors.push_front(minor);
        self
    }

    pub fn last(&self) -> &Major {
        &self.majors[self.majors.len() - 1]
    }

    pub fn first(&self) -> &Major {
        &self.majors[0]
    }

    pub fn build(self) -> AlternatingSequence<Major, Minor> {
        AlternatingSequence {
            majors: self.majors.into(),
            minors: self.minors.into(),
        }
    }
}
