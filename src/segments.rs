use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::btree_map::{IntoIter, Iter};
use std::fmt::{Debug, Display, Formatter};
use std::ops::{BitOrAssign, Deref, DerefMut, SubAssign};
use std::ops::Bound::Included;
use crate::{btreeset, escape_char, UTF8_END, UTF8_GAP_MAX, UTF8_GAP_MIN, UTF8_MIN};

#[cfg(test)]
use std::fmt::LowerHex;

// ---------------------------------------------------------------------------------------------
// Seg

/// Half-open range of codepoint values: `Seg(a, b)` covers `a..b`. Empty when `a >= b`.
#[derive(Clone, Copy, PartialOrd, PartialEq, Eq, Ord, Debug, Hash)]
pub struct Seg(pub u32, pub u32);

impl Seg {
    /// low segment of Unicode codepoint values:
    pub const LOW: Seg = Seg(UTF8_MIN, UTF8_GAP_MIN);
    /// high segment of Unicode codepoint values:
    pub const HIGH: Seg = Seg(UTF8_GAP_MAX + 1, UTF8_END);

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 >= self.1
    }

    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        self.0 <= value && value < self.1
    }

    /// `true` when the segments overlap or touch (after ordering by lower bound,
    /// `a.upper >= b.lower`), so their union is a single segment.
    #[inline]
    pub fn can_merge(&self, other: &Seg) -> bool {
        self.0.max(other.0) <= self.1.min(other.1)
    }

    /// Hull of two mergeable segments.
    #[inline]
    pub fn merge(&self, other: &Seg) -> Seg {
        Seg(self.0.min(other.0), self.1.max(other.1))
    }

    pub fn from_char(c: char) -> Seg {
        Seg(c as u32, c as u32 + 1)
    }
}

impl Display for Seg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0 + 1 == self.1 {
            write!(f, "'{}'", escape_char(char::from_u32(self.0).unwrap()))
        } else {
            write!(f, "'{}'-'{}'", escape_char(char::from_u32(self.0).unwrap()),
                   escape_char(char::from_u32(self.1 - 1).unwrap()))
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Segments

/// Set of codepoints stored as an ordered sequence of non-overlapping, non-adjacent
/// half-open segments. The mutating operators preserve that invariant:
/// `|=` is the union, `-=` the difference.
#[derive(Clone, PartialEq, Default, PartialOrd, Eq, Ord, Hash)]
pub struct Segments(pub BTreeSet<Seg>);

impl Segments {

    #[inline]
    pub fn empty() -> Self {
        Segments(btreeset![])
    }

    pub fn new(seg: Seg) -> Self {
        if !seg.is_empty() {
            Segments(btreeset![seg])
        } else {
            Self::empty()
        }
    }

    #[inline]
    pub fn dot() -> Segments {
        Segments(BTreeSet::from([Seg::LOW, Seg::HIGH]))
    }

    #[inline]
    pub fn is_dot(&self) -> bool {
        self.len() == 2 && self.first().unwrap() == &Seg::LOW && self.last().unwrap() == &Seg::HIGH
    }

    pub fn from_char(c: char) -> Self {
        Segments(btreeset![Seg::from_char(c)])
    }

    pub fn to_char(&self) -> Option<char> {
        if self.len() == 1 {
            let first = self.first().unwrap();
            if first.0 + 1 == first.1 {
                return char::from_u32(first.0)
            }
        }
        None
    }

    /// Inserts a raw segment without merging. The caller must keep the set invariant;
    /// use `|=` otherwise.
    pub fn insert(&mut self, seg: Seg) {
        if !seg.is_empty() {
            self.0.insert(seg);
        }
    }

    pub fn contains_value(&self, value: u32) -> bool {
        // first segment with lower bound <= value, then bound check
        match self.0.range(..=Seg(value, u32::MAX)).next_back() {
            Some(seg) => seg.contains(value),
            None => false
        }
    }

    /// Union with a segment: locates the first stored segment that can merge with `seg`,
    /// extends one step backwards if the predecessor touches it, then replaces every
    /// overlapping or adjacent segment with their hull.
    fn union_seg(&mut self, seg: Seg) {
        if seg.is_empty() {
            return;
        }
        let mut hull = seg;
        let mut first = seg.0;
        if let Some(&prev) = self.0.range(..Seg(seg.0, 0)).next_back() {
            if prev.1 >= seg.0 {
                first = prev.0;
            }
        }
        let merged = self.0.range(Seg(first, 0)..=Seg(seg.1, u32::MAX)).cloned().collect::<Vec<_>>();
        for s in merged {
            hull = hull.merge(&s);
            self.0.remove(&s);
        }
        self.0.insert(hull);
    }

    /// Difference with a segment: removes every symbol of `seg`, splitting the
    /// boundary segments when necessary.
    fn difference_seg(&mut self, seg: Seg) {
        if seg.is_empty() {
            return;
        }
        let mut affected = Vec::new();
        if let Some(&prev) = self.0.range(..Seg(seg.0, 0)).next_back() {
            if prev.1 > seg.0 {
                affected.push(prev);
            }
        }
        affected.extend(self.0.range(Seg(seg.0, 0)..Seg(seg.1, 0)).cloned());
        for s in affected {
            self.0.remove(&s);
            if s.0 < seg.0 {
                self.0.insert(Seg(s.0, seg.0));
            }
            if s.1 > seg.1 {
                self.0.insert(Seg(seg.1, s.1));
            }
        }
    }

    // (a, b) inter (c, d) => (common, internal a-b, external a-b)
    // only processes a < c || (a == c && b <= d)
    pub fn segment_intersect(Seg(a, b): Seg, Seg(c, d): Seg) -> SegmentsCmp {
        if a < c || (a == c && b <= d) {
            if a < c {
                if b <= c {
                    SegmentsCmp { common: Segments::empty(), internal: Segments::new(Seg(a, b)), external: Segments::new(Seg(c, d)) }
                } else if b <= d {
                    SegmentsCmp { common: Segments::new(Seg(c, b)), internal: Segments::new(Seg(a, c)), external: Segments::new(Seg(b, d)) }
                } else {
                    SegmentsCmp { common: Segments::new(Seg(c, d)), internal: Segments(btreeset![Seg(a, c), Seg(d, b)]), external: Segments::empty() }
                }
            } else {
                SegmentsCmp { common: Segments::new(Seg(a, b)), internal: Segments::empty(), external: Segments::new(Seg(b, d)) }
            }
        } else {
            Self::segment_intersect(Seg(c, d), Seg(a, b)).inverse()
        }
    }

    pub fn intersect(&self, other: &Self) -> SegmentsCmp {
        let mut ab_iter = self.iter();
        let mut cd_iter = other.iter();
        let mut ab = ab_iter.next().cloned();
        let mut cd = cd_iter.next().cloned();
        let mut result = SegmentsCmp::empty();
        while let (Some(new_ab), Some(new_cd)) = (ab, cd) {
            let mut cmp = Self::segment_intersect(new_ab, new_cd);
            if cmp.common.is_empty() {
                if new_ab.1 <= new_cd.0 {
                    result.internal.insert(new_ab);
                    ab = ab_iter.next().cloned();
                } else {
                    result.external.insert(new_cd);
                    cd = cd_iter.next().cloned();
                }
            } else {
                if new_ab.1 > new_cd.1 { // processes the trailing segment
                    ab = cmp.internal.pop_last();
                } else {
                    ab = ab_iter.next().cloned();
                }
                if new_cd.1 > new_ab.1 {
                    cd = cmp.external.pop_last();
                } else {
                    cd = cd_iter.next().cloned();
                }
                result.extend(&cmp);
            }
        }
        if let Some(ab) = ab {
            result.internal.insert(ab);
            result.internal.extend(ab_iter);
        } else if let Some(cd) = cd {
            result.external.insert(cd);
            result.external.extend(cd_iter);
        }
        result
    }

    /// Partitions the segments in function of `other`'s segments, splitting the current
    /// segments according to `other` and adding segments from `other`. Can be used
    /// iteratively on a collection of Segments to obtain a partition of their segments.
    ///
    /// Returns `true` if the segments were modified.
    pub fn add_partition(&mut self, other: &Self) -> bool {
        let cmp = self.intersect(other);
        if !(cmp.common.is_empty() && cmp.external.is_empty()) {
            self.clear();
            self.extend(cmp.internal.0);
            self.extend(cmp.common.0);
            self.extend(cmp.external.0);
            true
        } else {
            false
        }
    }

    /// Merges overlapping and adjacent segments after raw insertions.
    pub fn normalize(&mut self) {
        if !self.is_empty() {
            let mut new = BTreeSet::<Seg>::new();
            let mut segments = std::mem::take(&mut self.0).into_iter();
            let mut last = segments.next().unwrap();
            for Seg(a, b) in segments {
                if a > last.1 {
                    new.insert(last);
                    last = Seg(a, b);
                } else {
                    last.1 = last.1.max(b);
                }
            }
            new.insert(last);
            self.0 = new;
        }
    }

    pub fn normalized(&self) -> Self {
        let mut n = self.clone();
        n.normalize();
        n
    }

    /// Inserts `Seg(start, end)` except the UTF-8 surrogate gap; if a part or the
    /// entirety of the gap is within `[start, end)`, it is extruded first.
    pub fn insert_utf8(&mut self, start: u32, end: u32) {
        if start < end {
            if end <= UTF8_GAP_MIN || start > UTF8_GAP_MAX {
                self.0.insert(Seg(start, end));
            } else {
                if start < UTF8_GAP_MIN {
                    self.0.insert(Seg(start, UTF8_GAP_MIN));
                }
                if end > UTF8_GAP_MAX + 1 {
                    self.0.insert(Seg(UTF8_GAP_MAX + 1, end));
                }
            }
        }
    }

    /// Negates the selection, except the UTF-8 surrogate gap, which is always excluded.
    pub fn not(&self) -> Self {
        let mut inv = Segments::empty();
        let mut start = UTF8_MIN;
        for seg in &self.0 {
            if seg.0 > start {
                inv.insert_utf8(start, seg.0);
            }
            start = seg.1;
        }
        if start < UTF8_END {
            inv.insert_utf8(start, UTF8_END);
        }
        inv
    }

    /// Number of codepoints in the set.
    pub fn count_values(&self) -> u32 {
        self.0.iter().map(|seg| seg.1 - seg.0).sum()
    }

    pub fn chars(&self) -> SegmentsCharIter {
        SegmentsCharIter { segments: self.0.clone(), current: None }
    }
}

impl BitOrAssign<Seg> for Segments {
    fn bitor_assign(&mut self, seg: Seg) {
        self.union_seg(seg);
    }
}

impl BitOrAssign<&Segments> for Segments {
    fn bitor_assign(&mut self, other: &Segments) {
        for &seg in other.iter() {
            self.union_seg(seg);
        }
    }
}

impl SubAssign<Seg> for Segments {
    fn sub_assign(&mut self, seg: Seg) {
        self.difference_seg(seg);
    }
}

impl SubAssign<&Segments> for Segments {
    fn sub_assign(&mut self, other: &Segments) {
        for &seg in other.iter() {
            self.difference_seg(seg);
        }
    }
}

impl<const N: usize> From<[Seg; N]> for Segments {
    fn from(arr: [Seg; N]) -> Self {
        Segments(BTreeSet::from(arr))
    }
}

impl FromIterator<Seg> for Segments {
    fn from_iter<T: IntoIterator<Item = Seg>>(iter: T) -> Self {
        Segments(BTreeSet::from_iter(iter))
    }
}

impl Deref for Segments {
    type Target = BTreeSet<Seg>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Segments {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Debug for Segments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Segments({})", self.0.iter().map(|seg| format!("Seg(0x{:x}, 0x{:x})", seg.0, seg.1)).collect::<Vec<_>>().join(", "))
    }
}

impl Display for Segments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(c) = self.to_char() {
            write!(f, "'{}'", escape_char(c))
        } else if self.is_dot() {
            write!(f, "DOT")
        } else {
            write!(f, "[{}]", self.0.iter()
                .map(|seg| seg.to_string())
                .collect::<Vec<_>>()
                .join(", ")
            )
        }
    }
}

#[cfg(test)]
/// "{:x}" is used to show the raw segments with codes
impl LowerHex for Segments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iter()
            .map(|Seg(a, b)| if *a + 1 == *b { format!("{a}") } else { format!("{a}-{b}") })
            .collect::<Vec<_>>()
            .join(", ")
        )
    }
}

pub struct SegmentsCharIter {
    segments: BTreeSet<Seg>,
    current: Option<std::ops::Range<u32>>
}

impl Iterator for SegmentsCharIter {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(range) = &mut self.current {
                if let Some(code) = range.next() {
                    return char::from_u32(code);
                }
            }
            let Seg(a, b) = self.segments.pop_first()?;
            self.current = Some(a..b);
        }
    }
}

// ---------------------------------------------------------------------------------------------
// SegmentsCmp

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentsCmp {
    pub common: Segments,      // common to self and other
    pub internal: Segments,    // only in self, external to other
    pub external: Segments     // external to self, only in other
}

impl SegmentsCmp {
    pub fn empty() -> Self {
        SegmentsCmp { common: Segments::empty(), internal: Segments::empty(), external: Segments::empty() }
    }

    pub fn inverse(self) -> Self {
        SegmentsCmp { common: self.common, internal: self.external, external: self.internal }
    }

    pub fn extend(&mut self, other: &Self) {
        self.common.extend(other.common.iter());
        self.internal.extend(other.internal.iter());
        self.external.extend(other.external.iter());
    }

    pub fn normalize(&mut self) {
        self.common.normalize();
        self.internal.normalize();
        self.external.normalize();
    }
}

impl Display for SegmentsCmp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<common: {}, internal: {}, external: {}>", self.common, self.internal, self.external)
    }
}

// ---------------------------------------------------------------------------------------------
// SegMap

/// Map keyed by disjoint segments, with point lookup through an upper-bound search.
#[derive(Debug, Clone, PartialEq)]
pub struct SegMap<T>(BTreeMap<Seg, T>);

impl<T: Clone> SegMap<T> {
    pub fn new() -> Self {
        SegMap(BTreeMap::new())
    }

    pub fn keys(&self) -> impl Iterator<Item = &Seg> {
        self.0.keys()
    }

    pub fn get(&self, value: u32) -> Option<T> {
        let (seg, data) = self.0.range((Included(&Seg(0, 0)), Included(&Seg(value, u32::MAX)))).next_back()?;
        if seg.contains(value) {
            Some(data.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: Seg, value: T) -> Option<T> {
        self.0.insert(key, value)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Seg, T> {
        self.into_iter()
    }
}

impl<T: Clone> FromIterator<(Seg, T)> for SegMap<T> {
    fn from_iter<I: IntoIterator<Item = (Seg, T)>>(iter: I) -> Self {
        SegMap(BTreeMap::from_iter(iter))
    }
}

impl<T> IntoIterator for SegMap<T> {
    type Item = (Seg, T);
    type IntoIter = IntoIter<Seg, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a SegMap<T> {
    type Item = (&'a Seg, &'a T);
    type IntoIter = Iter<'a, Seg, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::{seg, segments};
    use super::*;

    #[cfg(test)]
    impl LowerHex for SegmentsCmp {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "<common: {:x}, internal: {:x}, external: {:x}>", self.common, self.internal, self.external)
        }
    }

    #[test]
    fn segs_union() {
        let tests: Vec<(Segments, Seg, Segments)> = vec![
            (segments![], Seg(10, 20), segments![10-19]),
            (segments![10-19], Seg(30, 40), segments![10-19, 30-39]),
            (segments![10-19, 30-39], Seg(20, 30), segments![10-39]),
            (segments![10-19, 30-39], Seg(15, 32), segments![10-39]),
            (segments![10-19, 30-39], Seg(0, 50), segments![0-49]),
            (segments![10-19], Seg(5, 10), segments![5-19]),
            (segments![10-19], Seg(0, 5), segments![0-4, 10-19]),
            (segments![10-19], Seg(12, 15), segments![10-19]),
            (segments![10-19, 30-39, 50-59], Seg(20, 45), segments![10-45, 50-59]),
        ];
        for (idx, (mut set, seg, expected)) in tests.into_iter().enumerate() {
            set |= seg;
            assert_eq!(set, expected, "test {idx} failed");
        }
    }

    #[test]
    fn segs_difference() {
        let tests: Vec<(Segments, Seg, Segments)> = vec![
            (segments![], Seg(10, 20), segments![]),
            (segments![10-19], Seg(10, 20), segments![]),
            (segments![10-19], Seg(0, 50), segments![]),
            (segments![10-19], Seg(12, 15), segments![10-11, 15-19]),
            (segments![10-19], Seg(0, 15), segments![15-19]),
            (segments![10-19], Seg(15, 50), segments![10-14]),
            (segments![10-19, 30-39], Seg(15, 35), segments![10-14, 35-39]),
            (segments![10-19, 30-39], Seg(20, 30), segments![10-19, 30-39]),
            (segments![10-19, 30-39, 50-59], Seg(15, 55), segments![10-14, 55-59]),
        ];
        for (idx, (mut set, seg, expected)) in tests.into_iter().enumerate() {
            set -= seg;
            assert_eq!(set, expected, "test {idx} failed");
        }
    }

    #[test]
    fn segs_union_difference_invariant() {
        // pseudo-random walk; checks non-overlap / non-adjacency after every step
        let mut set = Segments::empty();
        let mut x: u32 = 12345;
        for step in 0..500 {
            x = x.wrapping_mul(1103515245).wrapping_add(12347);
            let a = x % 1000;
            let b = a + 1 + (x >> 16) % 50;
            if step % 3 == 0 {
                set -= Seg(a, b);
            } else {
                set |= Seg(a, b);
            }
            let mut last: Option<Seg> = None;
            for &seg in set.iter() {
                assert!(seg.0 < seg.1, "step {step}: empty segment {seg:?}");
                if let Some(prev) = last {
                    assert!(prev.1 < seg.0, "step {step}: {prev:?} touches {seg:?}");
                }
                last = Some(seg);
            }
        }
    }

    #[test]
    fn segs_contains() {
        let set = segments!['a'-'z', '0'-'9'];
        assert!(set.contains_value('a' as u32));
        assert!(set.contains_value('m' as u32));
        assert!(set.contains_value('z' as u32));
        assert!(set.contains_value('5' as u32));
        assert!(!set.contains_value('A' as u32));
        assert!(!set.contains_value('z' as u32 + 1));
        assert!(!set.contains_value(0));
    }

    fn new_cmp(c: Seg, i: Seg, e: Seg) -> SegmentsCmp {
        SegmentsCmp { common: Segments::new(c), internal: Segments::new(i), external: Segments::new(e) }
    }

    #[test]
    fn segs_segment_intersect() {
        let tests = vec![
            (Seg(1, 3), Seg(4, 5), new_cmp(Seg(9, 0), Seg(1, 3), Seg(4, 5))),
            (Seg(1, 3), Seg(3, 4), new_cmp(Seg(9, 0), Seg(1, 3), Seg(3, 4))),
            (Seg(1, 4), Seg(2, 5), new_cmp(Seg(2, 4), Seg(1, 2), Seg(4, 5))),
            (Seg(1, 4), Seg(2, 4), new_cmp(Seg(2, 4), Seg(1, 2), Seg(9, 0))),
            (Seg(1, 5), Seg(2, 4), SegmentsCmp { common: Segments::new(Seg(2, 4)), internal: Segments(btreeset![Seg(1, 2), Seg(4, 5)]), external: Segments::empty() }),
            (Seg(1, 3), Seg(1, 4), new_cmp(Seg(1, 3), Seg(9, 0), Seg(3, 4))),
            (Seg(1, 3), Seg(1, 3), new_cmp(Seg(1, 3), Seg(9, 0), Seg(9, 0))),
            (Seg(1, 4), Seg(1, 3), new_cmp(Seg(1, 3), Seg(3, 4), Seg(9, 0))),
            (Seg(2, 4), Seg(1, 5), SegmentsCmp { common: Segments::new(Seg(2, 4)), internal: Segments::empty(), external: Segments(btreeset![Seg(1, 2), Seg(4, 5)]) }),
            (Seg(2, 4), Seg(1, 4), new_cmp(Seg(2, 4), Seg(9, 0), Seg(1, 2))),
            (Seg(2, 5), Seg(1, 4), new_cmp(Seg(2, 4), Seg(4, 5), Seg(1, 2))),
            (Seg(4, 5), Seg(1, 3), new_cmp(Seg(9, 0), Seg(4, 5), Seg(1, 3))),
        ];
        for (idx, (ab, cd, expected_cmp)) in tests.into_iter().enumerate() {
            let cmp = Segments::segment_intersect(ab, cd);
            assert_eq!(cmp, expected_cmp, "test {idx} failed");
        }
    }

    #[test]
    fn segs_intersect() {
        let tests: Vec<(Segments, Segments, (Segments, Segments, Segments))> = vec![
            (segments![1-50], segments![10-20, 30-40],
             (segments![10-20, 30-40], segments![1-9, 21-29, 41-50], segments![])),
            (segments![10-20, 30-40], segments![1-50],
             (segments![10-20, 30-40], segments![], segments![1-9, 21-29, 41-50])),
            (segments![0-9], segments![0-0, 1-9],
             (segments![0-9], segments![], segments![])),
            (segments![1-10, 30-40], segments![11-20, 25-29, 41-100],
             (segments![], segments![1-10, 30-40], segments![11-20, 25-29, 41-100])),
            (segments![], segments![],
             (segments![], segments![], segments![])),
        ];
        for (idx, (ab, cd, expected_cmp)) in tests.into_iter().enumerate() {
            let expected_cmp = SegmentsCmp { common: expected_cmp.0.normalized(), internal: expected_cmp.1.normalized(), external: expected_cmp.2.normalized() };
            let mut cmp = ab.intersect(&cd);
            cmp.normalize();
            assert_eq!(cmp, expected_cmp, "test {idx} failed");
            let mut cmp = cd.intersect(&ab);
            cmp.normalize();
            assert_eq!(cmp, expected_cmp.inverse(), "test {idx} failed");
        }
    }

    #[test]
    fn segs_partition() {
        let tests: Vec<(Segments, Segments, Segments)> = vec![
            (segments![1-4], segments![3-6], segments![1-2, 3-4, 5-6]),
            (segments![1-4], segments![5-6], segments![1-4, 5-6]),
            (segments![1-6], segments![3-4], segments![1-2, 3-4, 5-6]),
            (segments![1-4, 5-10], segments![], segments![1-4, 5-10]),
            (segments![], segments![1-4, 5-10], segments![1-4, 5-10]),
            (segments![1-4, 5-10], segments![3-5], segments![1-2, 3-4, 5-5, 6-10]),
        ];
        for (idx, (mut ab, cd, expected)) in tests.into_iter().enumerate() {
            ab.add_partition(&cd);
            assert_eq!(ab, expected, "test {idx} failed");
        }
    }

    #[test]
    fn segs_not() {
        let tests = vec![
            (segments![DOT], segments![]),
            (segments![], segments![DOT]),
            (Segments::from([Seg(0, 1)]), Segments::from([Seg(1, UTF8_GAP_MIN), Seg::HIGH])),
            (Segments::from([Seg(0, UTF8_END)]), segments![]),
            (Segments::from([Seg(3, UTF8_GAP_MIN)]), Segments::from([Seg(0, 3), Seg::HIGH])),
            (Segments::from([Seg(4, UTF8_GAP_MAX + 1)]), Segments::from([Seg(0, 4), Seg::HIGH])),
        ];
        for (test_id, (segments, expected)) in tests.into_iter().enumerate() {
            let result = segments.not();
            assert_eq!(result.normalized(), expected.normalized(), "test {test_id} failed");
        }
    }

    #[test]
    fn segs_chars() {
        let tests = vec![
            (segments!['a'-'a'], "a"),
            (segments!['a'-'d'], "abcd"),
            (segments!['a'-'c', 'x'-'z'], "abcxyz"),
            (segments!['a'-'b', 'd'-'d', 'f'-'f', 'x'-'z'], "abdfxyz"),
        ];
        for (idx, (segments, expected)) in tests.into_iter().enumerate() {
            let result = segments.chars().collect::<String>();
            assert_eq!(result, expected, "test {idx} failed");
        }
    }

    #[test]
    fn segs_ord() {
        // structural equality and lexicographic ordering on the segment sequence
        assert_eq!(segments!['a'-'z'], segments!['a'-'z']);
        assert_ne!(segments!['a'-'z'], segments!['a'-'y']);
        assert!(segments!['a'-'y'] < segments!['a'-'z']);
        assert!(segments!['a'-'b'] < segments!['b'-'c']);
        assert!(segments![] < segments!['a']);
    }

    #[test]
    fn segmap_get() {
        let map = SegMap::from_iter([(seg!('a'-'z'), 1), (seg!('0'-'9'), 2), (Seg(200, 300), 3)]);
        let tests = vec![
            ('a' as u32, Some(1)), ('z' as u32, Some(1)), ('{' as u32, None),
            ('0' as u32, Some(2)), ('9' as u32, Some(2)),
            (199, None), (200, Some(3)), (299, Some(3)), (300, None),
        ];
        for (idx, (value, expected)) in tests.into_iter().enumerate() {
            assert_eq!(map.get(value), expected, "test {idx} failed");
        }
    }
}
