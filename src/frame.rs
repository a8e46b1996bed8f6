use dicom::core::Tag;
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;

use crate::position::PatientPosition;
use crate::seg_loader::SegVolumeError;
use crate::validate::clean_string;

/// Physical pixel spacing: in-plane row/column distances plus the optional
/// through-plane distance between adjacent slices, all in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub row: f64,
    pub column: f64,
    pub between_slices: Option<f64>,
}

/// A source image referenced by a frame's derivation information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceImageRef {
    pub referenced_sop_class_uid: Option<String>,
    pub referenced_sop_instance_uid: Option<String>,
}

/// Everything extracted from one item of the per-frame functional groups
/// sequence. One such record exists per frame of the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub dimension_index_values: Vec<u32>,
    pub image_position_patient: PatientPosition,
    pub derivation_images: Vec<Vec<SourceImageRef>>,
    pub referenced_segment_number: u16,
    pub image_orientation_patient: Option<[f64; 6]>,
    pub spacing: Option<Spacing>,
}

/// Reads one per-frame functional-group item. The frame content, segment
/// identification, and plane position sub-sequences are mandatory; plane
/// orientation and pixel measures may instead come from the shared group.
pub(crate) fn read_frame_item(item: &InMemDicomObject) -> Result<FrameInfo, SegVolumeError> {
    let derivation_images = read_derivation_images(item);

    let frame_content = first_item(item, tags::FRAME_CONTENT_SEQUENCE).ok_or(
        SegVolumeError::MissingRequiredElement("frame content sequence"),
    )?;
    let dimension_index_values = frame_content
        .element(tags::DIMENSION_INDEX_VALUES)
        .ok()
        .and_then(|element| element.to_multi_int::<u32>().ok())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "dimension index values",
        ))?
        .to_vec();

    let segment_identification = first_item(item, tags::SEGMENT_IDENTIFICATION_SEQUENCE).ok_or(
        SegVolumeError::MissingRequiredElement("segment identification sequence"),
    )?;
    let referenced_segment_number = segment_identification
        .element(tags::REFERENCED_SEGMENT_NUMBER)
        .ok()
        .and_then(|element| element.to_int::<u16>().ok())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "referenced segment number",
        ))?;

    let plane_position = first_item(item, tags::PLANE_POSITION_SEQUENCE).ok_or(
        SegVolumeError::MissingRequiredElement("plane position sequence"),
    )?;
    let position = plane_position
        .element(tags::IMAGE_POSITION_PATIENT)
        .ok()
        .ok_or(SegVolumeError::MissingRequiredElement(
            "image position patient",
        ))?
        .to_multi_float64()
        .map_err(|_| SegVolumeError::MalformedValue {
            name: "image position patient",
        })?;
    if position.len() < 3 {
        return Err(SegVolumeError::MalformedValue {
            name: "image position patient",
        });
    }
    let image_position_patient = [position[0], position[1], position[2]];

    let image_orientation_patient = read_plane_orientation(item)?;
    let spacing = read_pixel_measures(item)?;

    Ok(FrameInfo {
        dimension_index_values,
        image_position_patient,
        derivation_images,
        referenced_segment_number,
        image_orientation_patient,
        spacing,
    })
}

/// Plane orientation nested in a functional-group item, when present.
/// Shared and per-frame groups use the same layout.
pub(crate) fn read_plane_orientation(
    group: &InMemDicomObject,
) -> Result<Option<[f64; 6]>, SegVolumeError> {
    let Some(item) = first_item(group, tags::PLANE_ORIENTATION_SEQUENCE) else {
        return Ok(None);
    };
    let values = item
        .element(tags::IMAGE_ORIENTATION_PATIENT)
        .ok()
        .ok_or(SegVolumeError::MissingRequiredElement(
            "image orientation patient",
        ))?
        .to_multi_float64()
        .map_err(|_| SegVolumeError::MalformedValue {
            name: "image orientation patient",
        })?;
    if values.len() < 6 {
        return Err(SegVolumeError::MalformedValue {
            name: "image orientation patient",
        });
    }
    Ok(Some([
        values[0], values[1], values[2], values[3], values[4], values[5],
    ]))
}

/// Spacing from a functional-group item's pixel measures sub-tree. Returns
/// `None` either when the measures sequence itself or the pixel spacing
/// within it is absent; the through-plane component is optional.
pub(crate) fn read_pixel_measures(
    group: &InMemDicomObject,
) -> Result<Option<Spacing>, SegVolumeError> {
    let Some(measures) = first_item(group, tags::PIXEL_MEASURES_SEQUENCE) else {
        return Ok(None);
    };
    read_measures(measures)
}

fn read_measures(measures: &InMemDicomObject) -> Result<Option<Spacing>, SegVolumeError> {
    let Ok(element) = measures.element(tags::PIXEL_SPACING) else {
        return Ok(None);
    };
    let values = element
        .to_multi_float64()
        .map_err(|_| SegVolumeError::MalformedValue {
            name: "pixel spacing",
        })?;
    if values.len() < 2 {
        return Err(SegVolumeError::MalformedValue {
            name: "pixel spacing",
        });
    }

    let between_slices = match measures.element(tags::SPACING_BETWEEN_SLICES).ok() {
        Some(element) => Some(element.to_float64().map_err(|_| {
            SegVolumeError::MalformedValue {
                name: "spacing between slices",
            }
        })?),
        None => None,
    };

    Ok(Some(Spacing {
        row: values[0],
        column: values[1],
        between_slices,
    }))
}

fn read_derivation_images(item: &InMemDicomObject) -> Vec<Vec<SourceImageRef>> {
    let Some(derivation_items) = item
        .element(tags::DERIVATION_IMAGE_SEQUENCE)
        .ok()
        .and_then(|element| element.items())
    else {
        return Vec::new();
    };

    derivation_items
        .iter()
        .map(|derivation| {
            derivation
                .element(tags::SOURCE_IMAGE_SEQUENCE)
                .ok()
                .and_then(|element| element.items())
                .map(|sources| sources.iter().map(read_source_image).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn read_source_image(source: &InMemDicomObject) -> SourceImageRef {
    SourceImageRef {
        referenced_sop_class_uid: read_uid(source, tags::REFERENCED_SOP_CLASS_UID),
        referenced_sop_instance_uid: read_uid(source, tags::REFERENCED_SOP_INSTANCE_UID),
    }
}

fn read_uid(item: &InMemDicomObject, tag: Tag) -> Option<String> {
    item.element(tag)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
}

/// First item of a nested sequence, or `None` when the sequence is absent
/// or empty.
pub(crate) fn first_item(object: &InMemDicomObject, tag: Tag) -> Option<&InMemDicomObject> {
    object
        .element(tag)
        .ok()
        .and_then(|element| element.items())
        .and_then(|items| items.first())
}
