//! Chunk partitioning.
//!
//! Every chunk has exactly `size` elements except possibly the last, which
//! holds between 1 and `size`. Both iterators are lazy and can be restarted
//! by cloning.

use std::num::NonZeroUsize;
use std::ops::Range;
use std::slice::Chunks;

/// Split `items` into consecutive chunks of `size`.
pub fn partition<T>(items: &[T], size: NonZeroUsize) -> Chunks<'_, T> {
    items.chunks(size.get())
}

/// Split the index range `[0, total)` into consecutive ranges of `size`.
pub fn chunk_ranges(total: usize, size: NonZeroUsize) -> ChunkRanges {
    ChunkRanges {
        next: 0,
        total,
        size: size.get(),
    }
}

/// Iterator over index ranges produced by [`chunk_ranges`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRanges {
    next: usize,
    total: usize,
    size: usize,
}

impl Iterator for ChunkRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.size).min(self.total);
        self.next = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        let n = remaining.div_ceil(self.size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChunkRanges {}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn uneven_tail() {
        let items: Vec<u32> = (0..12).collect();
        let chunks: Vec<&[u32]> = partition(&items, nz(5)).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], &[10, 11]);
    }

    #[test]
    fn empty_input_has_no_chunks() {
        let items: [u8; 0] = [];
        assert_eq!(partition(&items, nz(3)).count(), 0);
        assert_eq!(chunk_ranges(0, nz(3)).count(), 0);
    }

    #[test]
    fn ranges_cover_every_index_once() {
        for total in 0..40 {
            for size in 1..9 {
                let ranges: Vec<_> = chunk_ranges(total, nz(size)).collect();
                let flat: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(flat, (0..total).collect::<Vec<_>>());
                assert!(ranges.iter().all(|r| !r.is_empty() && r.len() <= size));
                assert_eq!(ranges.len(), chunk_ranges(total, nz(size)).len());
            }
        }
    }

    #[test]
    fn restartable_by_clone() {
        let ranges = chunk_ranges(7, nz(3));
        let first: Vec<_> = ranges.clone().collect();
        let second: Vec<_> = ranges.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![0..3, 3..6, 6..7]);
    }
}
