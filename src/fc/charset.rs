use serde::{Deserialize, Serialize};

/// A set of Unicode code points stored as sorted, disjoint, non-adjacent
/// inclusive ranges.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Charset {
    ranges: Vec<(u32, u32)>,
}

impl Charset {
    pub fn new() -> Self {
        Charset::default()
    }

    /// Builds a set from possibly overlapping inclusive ranges.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut cs = Charset::new();
        for (start, end) in ranges {
            cs.insert_range(start, end);
        }
        cs
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The number of code points in the set.
    pub fn len(&self) -> u32 {
        self.ranges.iter().map(|(s, e)| e - s + 1).sum()
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn contains(&self, c: u32) -> bool {
        self.ranges
            .binary_search_by(|&(s, e)| {
                if e < c {
                    std::cmp::Ordering::Less
                } else if s > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    #[inline]
    pub fn insert(&mut self, c: u32) {
        self.insert_range(c, c);
    }

    pub fn insert_range(&mut self, start: u32, end: u32) {
        if start > end {
            return;
        }

        // First range that could touch `start`.
        let first = self.ranges.partition_point(|&(_, e)| e.saturating_add(1) < start);
        let mut new = (start, end);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].0 <= end.saturating_add(1) {
            new.0 = new.0.min(self.ranges[last].0);
            new.1 = new.1.max(self.ranges[last].1);
            last += 1;
        }

        self.ranges.splice(first..last, std::iter::once(new));
    }

    pub fn union(&self, other: &Charset) -> Charset {
        let mut out = self.clone();
        for &(s, e) in &other.ranges {
            out.insert_range(s, e);
        }
        out
    }

    /// Checks that every code point of `self` is in `other`.
    pub fn is_subset(&self, other: &Charset) -> bool {
        self.subtract_count(other) == 0
    }

    /// Counts the code points of `self` missing from `other`.
    pub fn subtract_count(&self, other: &Charset) -> u32 {
        let mut missing = 0;
        let mut j = 0;
        for &(s, e) in &self.ranges {
            let mut covered = 0;
            while j < other.ranges.len() && other.ranges[j].1 < s {
                j += 1;
            }

            let mut k = j;
            while k < other.ranges.len() && other.ranges[k].0 <= e {
                let (os, oe) = other.ranges[k];
                covered += oe.min(e) - os.max(s) + 1;
                k += 1;
            }

            missing += e - s + 1 - covered;
        }

        missing
    }

    pub(crate) fn write_hash(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.ranges.len() as u32).to_be_bytes());
        for &(s, e) in &self.ranges {
            out.extend_from_slice(&s.to_be_bytes());
            out.extend_from_slice(&e.to_be_bytes());
        }
    }
}

impl FromIterator<char> for Charset {
    fn from_iter<T: IntoIterator<Item = char>>(iter: T) -> Self {
        let mut cs = Charset::new();
        for c in iter {
            cs.insert(c as u32);
        }
        cs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranges_coalesce() {
        let mut cs = Charset::new();
        cs.insert_range(10, 20);
        cs.insert_range(30, 40);
        cs.insert(21);
        assert_eq!(cs.ranges(), &[(10, 21), (30, 40)]);
        cs.insert_range(22, 29);
        assert_eq!(cs.ranges(), &[(10, 40)]);
        cs.insert_range(0, 5);
        assert_eq!(cs.ranges(), &[(0, 5), (10, 40)]);
        assert_eq!(cs.len(), 37);
    }

    #[test]
    fn membership() {
        let cs: Charset = "abcx".chars().collect();
        assert!(cs.contains('b' as u32));
        assert!(!cs.contains('d' as u32));
        assert!(cs.contains('x' as u32));
        assert_eq!(cs.ranges().len(), 2);
    }

    #[test]
    fn subtraction() {
        let need = Charset::from_ranges([(0x41, 0x5A), (0x61, 0x7A)]);
        let have = Charset::from_ranges([(0x41, 0x4A), (0x61, 0x7A), (0x100, 0x200)]);
        assert_eq!(need.subtract_count(&have), 16);
        assert!(!need.is_subset(&have));
        assert!(need.is_subset(&need.union(&have)));
        assert_eq!(Charset::new().subtract_count(&have), 0);
    }
}
