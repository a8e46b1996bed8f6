use std::collections::HashMap;
use std::path::Path;

use dicom::core::Tag;
use dicom::object::{DefaultDicomObject, InMemDicomObject, open_file};
use dicom_dictionary_std::tags;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::dimension::read_dimensions;
use crate::frame::{
    FrameInfo, first_item, read_frame_item, read_pixel_measures, read_plane_orientation,
};
use crate::segment::{DisplayValue, read_segments};
use crate::slices::SlicePositions;
use crate::validate::{clean_string, validate_object};
use crate::volume::{PhotometricInterpretation, SegMetadata, SegVolume, SegVolumeGeometry};

#[derive(Debug, Error)]
pub enum SegVolumeError {
    #[error("Pixel data compressed with {algorithm} is not supported")]
    UnsupportedTransferSyntax { algorithm: String },

    #[error("Invalid segmentation type {0:?}, only BINARY is supported")]
    InvalidSegmentationType(String),

    #[error("Unsupported dimension organization: {0}")]
    UnsupportedDimensionOrganization(String),

    #[error("Missing required element: {0}")]
    MissingRequiredElement(&'static str),

    #[error("Declared frame count {declared} disagrees with {actual}")]
    FrameCountMismatch { declared: usize, actual: usize },

    #[error("Frames with differing orientations are not supported")]
    MultiOrientationUnsupported,

    #[error("Frames with differing spacings are not supported")]
    MultiResolutionUnsupported,

    #[error("Neither the shared nor any per-frame group resolved orientation and spacing")]
    MissingGeometry,

    #[error("Segments mixing grayscale and color display values are not supported")]
    MixedDisplayValues,

    #[error("Malformed value: {name}")]
    MalformedValue { name: &'static str },

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// Decodes DICOM Segmentation objects into [`SegVolume`]s.
///
/// The decode is a pure single pass over the element tree and the frame
/// buffer: no state is retained between calls and the inputs are never
/// mutated, so independent decodes may run in parallel.
pub struct SegVolumeLoader;

impl SegVolumeLoader {
    /// Decode a SEG object into a labeled volume
    ///
    /// # Arguments
    ///
    /// * `object` - The SEG element tree
    /// * `frame_data` - Frame-major pixel samples, one byte per pixel
    ///   (zero = background); see [`Self::load_from_file`] for bit-packed
    ///   pixel data
    ///
    /// # Errors
    ///
    /// Returns an error when the object falls outside the supported subset
    /// or a required element is missing; no partial volume is ever built.
    pub fn load_from_object(
        object: &DefaultDicomObject,
        frame_data: &[u8],
    ) -> Result<SegVolume, SegVolumeError> {
        validate_object(object)?;

        let (columns, rows, declared_frames) = image_layout(object)?;
        let slice_size = columns * rows;
        // A buffer that is not a whole number of frames is malformed in its
        // own right, not merely a miscounted one.
        if frame_data.len() % slice_size != 0 {
            return Err(SegVolumeError::MalformedValue {
                name: "frame buffer length is not a multiple of the frame size",
            });
        }
        if frame_data.len() != declared_frames * slice_size {
            return Err(SegVolumeError::FrameCountMismatch {
                declared: declared_frames,
                actual: frame_data.len() / slice_size,
            });
        }

        let dimensions = read_dimensions(object)?;
        let segments = read_segments(object)?;
        let rgb_segments = segments
            .iter()
            .filter(|segment| segment.display_value.is_rgb())
            .count();
        if rgb_segments != 0 && rgb_segments != segments.len() {
            return Err(SegVolumeError::MixedDisplayValues);
        }
        let store_as_rgb = rgb_segments != 0;

        // Defaults from the shared functional groups, overridable (but not
        // contradictable) by any frame.
        let mut orientation = None;
        let mut spacing = None;
        if let Some(shared) = first_item(object, tags::SHARED_FUNCTIONAL_GROUPS_SEQUENCE) {
            orientation = read_plane_orientation(shared)?;
            spacing = read_pixel_measures(shared)?;
        }

        let per_frame_items: &[InMemDicomObject] = object
            .element(tags::PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE)
            .ok()
            .and_then(|element| element.items())
            .ok_or(SegVolumeError::MissingRequiredElement(
                "per-frame functional groups sequence",
            ))?;
        if per_frame_items.len() != declared_frames {
            return Err(SegVolumeError::FrameCountMismatch {
                declared: declared_frames,
                actual: per_frame_items.len(),
            });
        }
        let frames: Vec<FrameInfo> = per_frame_items
            .par_iter()
            .map(read_frame_item)
            .collect::<Result<_, _>>()?;

        let mut frame_positions = Vec::with_capacity(frames.len());
        for frame in &frames {
            if let Some(frame_orientation) = frame.image_orientation_patient {
                match orientation {
                    Some(existing) if existing != frame_orientation => {
                        return Err(SegVolumeError::MultiOrientationUnsupported);
                    }
                    _ => orientation = Some(frame_orientation),
                }
            }
            if let Some(frame_spacing) = frame.spacing {
                match spacing {
                    Some(existing) if existing != frame_spacing => {
                        return Err(SegVolumeError::MultiResolutionUnsupported);
                    }
                    _ => spacing = Some(frame_spacing),
                }
            }
            frame_positions.push(frame.image_position_patient);
        }
        let orientation = orientation.ok_or(SegVolumeError::MissingGeometry)?;
        let spacing = spacing.ok_or(SegVolumeError::MissingGeometry)?;

        let slice_set = SlicePositions::build(&frame_positions, spacing.between_slices);
        if slice_set.is_empty() {
            return Err(SegVolumeError::MissingGeometry);
        }
        debug!(
            frames = frames.len(),
            slices = slice_set.len(),
            synthesized = slice_set.synthesized(),
            segments = segments.len(),
            rgb = store_as_rgb,
            "assembling SEG volume"
        );

        let channels = if store_as_rgb { 3 } else { 1 };
        let mut data = vec![0u16; channels * slice_size * slice_set.len()];

        let display_values: HashMap<u16, DisplayValue> = segments
            .iter()
            .map(|segment| (segment.number, segment.display_value))
            .collect();

        // Scatter in input order so that on overlap the later frame wins.
        for (frame, pixels) in frames.iter().zip(frame_data.chunks_exact(slice_size)) {
            let display_value = *display_values
                .get(&frame.referenced_segment_number)
                .ok_or(SegVolumeError::MissingRequiredElement(
                    "segment referenced by frame",
                ))?;
            let slice_index = slice_set
                .slice_index(&frame.image_position_patient)
                .ok_or(SegVolumeError::MissingGeometry)?;
            scatter_frame(
                &mut data,
                channels,
                slice_index * slice_size,
                pixels,
                display_value,
            );
        }

        let positions = slice_set.positions();
        let geometry = SegVolumeGeometry {
            origin: positions[0],
            slice_origins: positions.to_vec(),
            spacing,
            orientation,
        };

        let metadata = SegMetadata {
            modality: read_string(object, tags::MODALITY),
            segmentation_type: read_string(object, tags::SEGMENTATION_TYPE)
                .unwrap_or_else(|| "BINARY".to_owned()),
            dimension_organization_type: read_string(object, tags::DIMENSION_ORGANIZATION_TYPE),
            dimensions,
            bits_stored: object
                .element(tags::BITS_STORED)
                .ok()
                .and_then(|element| element.to_int::<u16>().ok()),
            series_instance_uid: read_string(object, tags::SERIES_INSTANCE_UID).ok_or(
                SegVolumeError::MissingRequiredElement("series instance UID"),
            )?,
            segments,
            frames,
        };

        Ok(SegVolume {
            data,
            channels,
            columns,
            rows,
            photometric: if store_as_rgb {
                PhotometricInterpretation::Rgb
            } else {
                PhotometricInterpretation::Monochrome
            },
            geometry,
            metadata,
        })
    }

    /// Load a SEG volume from a .dcm file
    ///
    /// Binary SEG pixel data is stored bit-packed; the packed bits are
    /// expanded to one byte per pixel before decoding. Already expanded
    /// pixel data is passed through untouched.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<SegVolume, SegVolumeError> {
        let object = open_file(path.as_ref())?;

        let (columns, rows, declared_frames) = image_layout(&object)?;
        let pixel_data = object
            .element(tags::PIXEL_DATA)
            .ok()
            .ok_or(SegVolumeError::MissingRequiredElement("pixel data"))?
            .to_bytes()
            .map_err(|_| SegVolumeError::MalformedValue { name: "pixel data" })?;

        let frame_data = unpack_binary_frames(&pixel_data, columns * rows * declared_frames)?;
        Self::load_from_object(&object, &frame_data)
    }
}

/// Columns, rows, and the declared frame count (defaulting to a single
/// frame when the element is absent).
fn image_layout(object: &InMemDicomObject) -> Result<(usize, usize, usize), SegVolumeError> {
    let columns = object
        .element(tags::COLUMNS)
        .ok()
        .ok_or(SegVolumeError::MissingRequiredElement("columns"))?
        .to_int::<usize>()
        .map_err(|_| SegVolumeError::MalformedValue { name: "columns" })?;
    let rows = object
        .element(tags::ROWS)
        .ok()
        .ok_or(SegVolumeError::MissingRequiredElement("rows"))?
        .to_int::<usize>()
        .map_err(|_| SegVolumeError::MalformedValue { name: "rows" })?;
    if columns == 0 || rows == 0 {
        return Err(SegVolumeError::MalformedValue { name: "image size" });
    }

    let declared_frames = match object.element(tags::NUMBER_OF_FRAMES).ok() {
        Some(element) => element.to_int::<usize>().map_err(|_| {
            SegVolumeError::MalformedValue {
                name: "number of frames",
            }
        })?,
        None => 1,
    };

    Ok((columns, rows, declared_frames))
}

/// Writes one frame's labeled pixels into the output buffer. Background
/// (zero) samples leave the voxel untouched.
fn scatter_frame(
    data: &mut [u16],
    channels: usize,
    slice_offset: usize,
    pixels: &[u8],
    display_value: DisplayValue,
) {
    for (offset, &sample) in pixels.iter().enumerate() {
        if sample == 0 {
            continue;
        }
        let voxel = channels * (slice_offset + offset);
        match display_value {
            DisplayValue::Scalar(value) => data[voxel] = value,
            DisplayValue::Rgb { r, g, b } => {
                data[voxel] = u16::from(r);
                data[voxel + 1] = u16::from(g);
                data[voxel + 2] = u16::from(b);
            }
        }
    }
}

/// Expands bit-packed BINARY pixel data (LSB first) to one byte per pixel.
/// A buffer already holding one sample per pixel is returned as-is.
pub(crate) fn unpack_binary_frames(
    bytes: &[u8],
    pixel_count: usize,
) -> Result<Vec<u8>, SegVolumeError> {
    if bytes.len() == pixel_count {
        return Ok(bytes.to_vec());
    }
    if bytes.len() < pixel_count.div_ceil(8) {
        return Err(SegVolumeError::MalformedValue { name: "pixel data" });
    }
    Ok((0..pixel_count)
        .map(|pixel| (bytes[pixel / 8] >> (pixel % 8)) & 1)
        .collect())
}

fn read_string(object: &InMemDicomObject, tag: Tag) -> Option<String> {
    object
        .element(tag)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_lsb_first() {
        // 0b0000_0101 marks pixels 0 and 2.
        let unpacked = unpack_binary_frames(&[0b0000_0101], 4).expect("unpack");
        assert_eq!(unpacked, vec![1, 0, 1, 0]);
    }

    #[test]
    fn passes_expanded_buffers_through() {
        let unpacked = unpack_binary_frames(&[1, 0, 0, 1], 4).expect("unpack");
        assert_eq!(unpacked, vec![1, 0, 0, 1]);
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(unpack_binary_frames(&[0xFF], 16).is_err());
    }

    #[test]
    fn scatter_writes_rgb_interleaved() {
        let mut data = vec![0u16; 12];
        scatter_frame(
            &mut data,
            3,
            0,
            &[1, 0, 0, 1],
            DisplayValue::Rgb { r: 10, g: 20, b: 30 },
        );
        assert_eq!(data, vec![10, 20, 30, 0, 0, 0, 0, 0, 0, 10, 20, 30]);
    }
}
