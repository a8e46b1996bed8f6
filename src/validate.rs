use dicom::object::DefaultDicomObject;
use dicom_dictionary_std::tags;

use crate::seg_loader::SegVolumeError;

/// Strips the trailing space/NUL padding DICOM string values may carry.
pub(crate) fn clean_string(value: &str) -> &str {
    value.trim_end_matches([' ', '\0'])
}

/// Up-front validation of the constrained SEG subset this crate decodes:
/// uncompressed pixel data, binary segmentation type, and (when declared) a
/// 3D dimension organization. Each violation aborts the decode.
pub(crate) fn validate_object(object: &DefaultDicomObject) -> Result<(), SegVolumeError> {
    let transfer_syntax = object.meta().transfer_syntax();
    if let Some(algorithm) = compression_algorithm(clean_string(transfer_syntax)) {
        return Err(SegVolumeError::UnsupportedTransferSyntax {
            algorithm: algorithm.to_owned(),
        });
    }

    let segmentation_type = object
        .element(tags::SEGMENTATION_TYPE)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
        .unwrap_or_default();
    if segmentation_type != "BINARY" {
        return Err(SegVolumeError::InvalidSegmentationType(segmentation_type));
    }

    if let Some(organization_type) = object
        .element(tags::DIMENSION_ORGANIZATION_TYPE)
        .ok()
        .and_then(|element| element.to_str().ok())
    {
        let organization_type = clean_string(&organization_type);
        if organization_type != "3D" {
            return Err(SegVolumeError::UnsupportedDimensionOrganization(format!(
                "dimension organization type {organization_type:?}, only \"3D\" is supported"
            )));
        }
    }

    Ok(())
}

/// Maps a transfer syntax UID to the name of its compression algorithm, or
/// `None` for the uncompressed syntaxes. Unknown UIDs are reported as-is so
/// the error still names what was encountered.
fn compression_algorithm(uid: &str) -> Option<&str> {
    match uid {
        "1.2.840.10008.1.2" | "1.2.840.10008.1.2.1" | "1.2.840.10008.1.2.2" => None,
        "1.2.840.10008.1.2.1.99" => Some("Deflate"),
        "1.2.840.10008.1.2.5" => Some("RLE"),
        "1.2.840.10008.1.2.4.50" | "1.2.840.10008.1.2.4.51" | "1.2.840.10008.1.2.4.57"
        | "1.2.840.10008.1.2.4.70" => Some("JPEG"),
        "1.2.840.10008.1.2.4.80" | "1.2.840.10008.1.2.4.81" => Some("JPEG-LS"),
        "1.2.840.10008.1.2.4.90" | "1.2.840.10008.1.2.4.91" | "1.2.840.10008.1.2.4.92"
        | "1.2.840.10008.1.2.4.93" => Some("JPEG 2000"),
        other => Some(other),
    }
}
