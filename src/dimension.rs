use dicom::core::Tag;
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;

use crate::seg_loader::SegVolumeError;
use crate::validate::clean_string;

/// One entry of the dimension index sequence (0020,9222).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionIndex {
    /// UID of the organization this index belongs to.
    pub organization: String,
    /// The attribute addressed by this index.
    pub pointer: Tag,
    pub label: Option<String>,
}

/// The single dimension organization a SEG object may declare, with its
/// index descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dimension {
    pub organizations: Vec<String>,
    pub indices: Vec<DimensionIndex>,
}

/// Reads the dimension organization sequence (exactly one item) and, when
/// present, the dimension index sequence (exactly two items, the second of
/// which must address ImagePositionPatient). Anything else is an
/// organization this decoder does not support.
pub(crate) fn read_dimensions(object: &InMemDicomObject) -> Result<Dimension, SegVolumeError> {
    let organization_items = object
        .element(tags::DIMENSION_ORGANIZATION_SEQUENCE)
        .ok()
        .and_then(|element| element.items())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "dimension organization sequence",
        ))?;
    if organization_items.len() != 1 {
        return Err(SegVolumeError::UnsupportedDimensionOrganization(format!(
            "expected 1 dimension organization, found {}",
            organization_items.len()
        )));
    }
    let organization_uid = organization_items[0]
        .element(tags::DIMENSION_ORGANIZATION_UID)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "dimension organization UID",
        ))?;

    let mut dimension = Dimension {
        organizations: vec![organization_uid.clone()],
        indices: Vec::new(),
    };

    let Some(index_items) = object
        .element(tags::DIMENSION_INDEX_SEQUENCE)
        .ok()
        .and_then(|element| element.items())
    else {
        return Ok(dimension);
    };
    if index_items.len() != 2 {
        return Err(SegVolumeError::UnsupportedDimensionOrganization(format!(
            "expected 2 dimension indices, found {}",
            index_items.len()
        )));
    }

    for item in index_items.iter() {
        let index = read_dimension_index(item, &organization_uid)?;
        dimension.indices.push(index);
    }

    // The second index must address the frame's 3D position, anything else
    // is an ordering this decoder cannot honor.
    if dimension.indices[1].pointer != tags::IMAGE_POSITION_PATIENT {
        return Err(SegVolumeError::UnsupportedDimensionOrganization(format!(
            "second dimension index points at {}, expected ImagePositionPatient",
            dimension.indices[1].pointer
        )));
    }

    Ok(dimension)
}

fn read_dimension_index(
    item: &InMemDicomObject,
    organization_uid: &str,
) -> Result<DimensionIndex, SegVolumeError> {
    let organization = item
        .element(tags::DIMENSION_ORGANIZATION_UID)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "dimension index organization UID",
        ))?;
    if organization != organization_uid {
        return Err(SegVolumeError::UnsupportedDimensionOrganization(format!(
            "dimension index references unknown organization {organization}"
        )));
    }

    let pointer = item
        .element(tags::DIMENSION_INDEX_POINTER)
        .ok()
        .and_then(read_tag_value)
        .ok_or(SegVolumeError::MissingRequiredElement(
            "dimension index pointer",
        ))?;

    let label = item
        .element(tags::DIMENSION_DESCRIPTION_LABEL)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned());

    Ok(DimensionIndex {
        organization,
        pointer,
        label,
    })
}

/// Pulls the first attribute tag out of an AT element.
fn read_tag_value(
    element: &dicom::object::mem::InMemElement<dicom::dictionary_std::StandardDataDictionary>,
) -> Option<Tag> {
    use dicom::core::PrimitiveValue;

    match element.value().primitive() {
        Some(PrimitiveValue::Tags(pointers)) => pointers.first().copied(),
        _ => None,
    }
}
