use ndarray::ArrayView4;

use crate::dimension::Dimension;
use crate::frame::{FrameInfo, Spacing};
use crate::position::PatientPosition;
use crate::segment::Segment;

/// How the voxel values of a [`SegVolume`] are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotometricInterpretation {
    /// One channel per voxel holding the segment's grayscale display value.
    #[default]
    Monochrome,
    /// Three interleaved channels per voxel holding the segment's color.
    Rgb,
}

/// Spatial placement of the volume in the patient coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct SegVolumeGeometry {
    /// Origin of the first (most superior) slice.
    pub origin: PatientPosition,
    /// Origin of every slice, in slice order. `slice_origins[0] == origin`.
    pub slice_origins: Vec<PatientPosition>,
    pub spacing: Spacing,
    /// Row and column direction cosines shared by all frames.
    pub orientation: [f64; 6],
}

/// Non-geometric attributes carried along for downstream display and
/// segment selection.
#[derive(Debug, Clone)]
pub struct SegMetadata {
    pub modality: Option<String>,
    pub segmentation_type: String,
    pub dimension_organization_type: Option<String>,
    pub dimensions: Dimension,
    pub bits_stored: Option<u16>,
    pub series_instance_uid: String,
    pub segments: Vec<Segment>,
    pub frames: Vec<FrameInfo>,
}

/// A decoded SEG object: one gap-free labeled volume plus its geometry and
/// metadata. The buffer is flat and channel-interleaved, voxel `(s, r, c)`
/// starts at `channels * (s * rows * columns + r * columns + c)`.
#[derive(Debug, Clone)]
pub struct SegVolume {
    pub data: Vec<u16>,
    pub channels: usize,
    pub columns: usize,
    pub rows: usize,
    pub photometric: PhotometricInterpretation,
    pub geometry: SegVolumeGeometry,
    pub metadata: SegMetadata,
}

impl SegVolume {
    /// Get the dimensions of the volume (slices, rows, columns)
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.slices(), self.rows, self.columns)
    }

    pub fn slices(&self) -> usize {
        self.geometry.slice_origins.len()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Channel-interleaved view shaped `(slice, row, column, channel)`.
    pub fn as_array(&self) -> Option<ArrayView4<'_, u16>> {
        ArrayView4::from_shape(
            (self.slices(), self.rows, self.columns, self.channels),
            self.data.as_slice(),
        )
        .ok()
    }

    /// The raw values of one slice, or `None` when out of range.
    pub fn slice_data(&self, index: usize) -> Option<&[u16]> {
        let stride = self.channels * self.rows * self.columns;
        let start = index.checked_mul(stride)?;
        self.data.get(start..start.checked_add(stride)?)
    }
}
