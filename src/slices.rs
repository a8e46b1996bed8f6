use std::collections::{HashMap, HashSet};

use crate::position::{PatientPosition, compare_positions, position_key};

/// The completed slice set of the output volume: the unique frame
/// positions, sorted superior-to-inferior, with empty intermediate slices
/// synthesized wherever the through-plane spacing implies one. Also carries
/// the position→slice-index map the assembler scatters through.
#[derive(Debug, Clone)]
pub struct SlicePositions {
    positions: Vec<PatientPosition>,
    index: HashMap<[u64; 3], usize>,
    synthesized: usize,
}

impl SlicePositions {
    /// Builds the completed slice set from the raw per-frame positions
    /// (duplicates allowed, any order). `between_slices` is the agreed
    /// through-plane spacing; without one, no gap-filling takes place and
    /// the unique positions are used as-is.
    pub fn build(frame_positions: &[PatientPosition], between_slices: Option<f64>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<PatientPosition> = frame_positions
            .iter()
            .filter(|position| seen.insert(position_key(position)))
            .copied()
            .collect();
        unique.sort_by(compare_positions);

        let (positions, synthesized) = match between_slices {
            Some(spacing) if spacing > 0.0 => fill_gaps(&unique, spacing),
            _ => (unique, 0),
        };

        let index = positions
            .iter()
            .enumerate()
            .map(|(slice, position)| (position_key(position), slice))
            .collect();

        SlicePositions {
            positions,
            index,
            synthesized,
        }
    }

    /// Number of slices in the output volume.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The completed, descending-sorted position list; per-slice origins of
    /// the output geometry.
    pub fn positions(&self) -> &[PatientPosition] {
        &self.positions
    }

    /// Slice index for an exact (structural) position match.
    pub fn slice_index(&self, position: &PatientPosition) -> Option<usize> {
        self.index.get(&position_key(position)).copied()
    }

    /// How many slices were synthesized to close gaps.
    pub fn synthesized(&self) -> usize {
        self.synthesized
    }
}

/// Walks adjacent sorted positions and inserts synthetic ones wherever the
/// z-step exceeds the slice spacing. Frames only exist where a segment has
/// content, so a spatially present but empty slice shows up as such a gap.
fn fill_gaps(sorted: &[PatientPosition], spacing: f64) -> (Vec<PatientPosition>, usize) {
    let mut completed = Vec::with_capacity(sorted.len());
    let mut synthesized = 0;

    for pair in sorted.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        completed.push(current);

        let mut expected_z = current[2] - spacing;
        while expected_z - next[2] >= spacing {
            completed.push([current[0], current[1], expected_z]);
            synthesized += 1;
            expected_z -= spacing;
        }
    }
    if let Some(last) = sorted.last() {
        completed.push(*last);
    }

    (completed, synthesized)
}
