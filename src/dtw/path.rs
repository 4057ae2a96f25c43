/// A monotone non-decreasing sequence of `(source_frame, ref_frame)` pairs
/// from `(0, 0)` to `(n_s - 1, n_r - 1)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WarpingPath {
    pub pairs: Vec<(usize, usize)>,
}

impl WarpingPath {
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Checks the §8 universal invariant: weakly monotone in both
    /// coordinates, endpoints at `(0, 0)` and the terminal cell.
    pub fn is_monotone(&self) -> bool {
        self.pairs
            .windows(2)
            .all(|w| w[1].0 >= w[0].0 && w[1].1 >= w[0].1)
    }

    /// Swaps the two coordinates of every pair — the transpose used by
    /// the reversibility property in §8.
    pub fn transpose(&self) -> Self {
        Self {
            pairs: self.pairs.iter().map(|&(i, j)| (j, i)).collect(),
        }
    }

    /// Offsets every pair by `(source_offset, ref_offset)`, used when
    /// concatenating sub-alignments back into global frame coordinates.
    pub fn offset(&self, source_offset: usize, ref_offset: usize) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .map(|&(i, j)| (i + source_offset, j + ref_offset))
                .collect(),
        }
    }

    /// Builds, for each source frame index, the **last** reference frame
    /// reached — used to project a coarse path into a finer grid.
    pub fn last_ref_per_source(&self, source_len: usize) -> Vec<Option<usize>> {
        let mut last = vec![None; source_len];
        for &(i, j) in &self.pairs {
            if i < source_len {
                last[i] = Some(j);
            }
        }
        last
    }

    pub fn first_source_frame(&self) -> Option<usize> {
        self.pairs.first().map(|&(i, _)| i)
    }

    pub fn last_source_frame(&self) -> Option<usize> {
        self.pairs.last().map(|&(i, _)| i)
    }
}
