use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;

use crate::seg_loader::SegVolumeError;
use crate::validate::clean_string;

/// The value written into the output volume for a segment's voxels, either
/// a grayscale intensity or an sRGB color resolved from the recommended
/// CIELab display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayValue {
    Scalar(u16),
    Rgb { r: u8, g: u8, b: u8 },
}

impl DisplayValue {
    pub fn is_rgb(&self) -> bool {
        matches!(self, DisplayValue::Rgb { .. })
    }
}

/// One labeled structure of the SEG object. `number` is the key per-frame
/// items use to reference their segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub number: u16,
    pub label: String,
    pub algorithm_type: String,
    pub algorithm_name: Option<String>,
    pub display_value: DisplayValue,
}

impl Segment {
    /// Full identity: number, label, algorithm type and name, and display
    /// value must all agree. A name on only one side is a mismatch.
    pub fn is_equal(&self, other: &Segment) -> bool {
        self.number == other.number
            && self.label == other.label
            && self.algorithm_type == other.algorithm_type
            && self.algorithm_name == other.algorithm_name
            && self.display_value == other.display_value
    }

    /// Looser relation for deduplication heuristics: segments are similar
    /// when they share a number or a display value.
    pub fn is_similar(&self, other: &Segment) -> bool {
        self.number == other.number || self.display_value == other.display_value
    }
}

/// Builds one [`Segment`] per item of the segment sequence (0062,0002).
pub(crate) fn read_segments(object: &InMemDicomObject) -> Result<Vec<Segment>, SegVolumeError> {
    let items = object
        .element(tags::SEGMENT_SEQUENCE)
        .ok()
        .and_then(|element| element.items())
        .ok_or(SegVolumeError::MissingRequiredElement("segment sequence"))?;

    items.iter().map(read_segment_item).collect()
}

fn read_segment_item(item: &InMemDicomObject) -> Result<Segment, SegVolumeError> {
    let number = item
        .element(tags::SEGMENT_NUMBER)
        .ok()
        .and_then(|element| element.to_int::<u16>().ok())
        .ok_or(SegVolumeError::MissingRequiredElement("segment number"))?;
    let label = item
        .element(tags::SEGMENT_LABEL)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
        .ok_or(SegVolumeError::MissingRequiredElement("segment label"))?;
    let algorithm_type = item
        .element(tags::SEGMENT_ALGORITHM_TYPE)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned())
        .ok_or(SegVolumeError::MissingRequiredElement(
            "segment algorithm type",
        ))?;
    let algorithm_name = item
        .element(tags::SEGMENT_ALGORITHM_NAME)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| clean_string(&value).to_owned());

    let display_value = read_display_value(item)?;

    Ok(Segment {
        number,
        label,
        algorithm_type,
        algorithm_name,
        display_value,
    })
}

/// Prefers the grayscale recommended display value; falls back to the
/// CIELab value converted to sRGB. A segment carrying neither cannot be
/// written into the volume and is rejected here rather than failing later.
fn read_display_value(item: &InMemDicomObject) -> Result<DisplayValue, SegVolumeError> {
    if let Some(value) = item
        .element(tags::RECOMMENDED_DISPLAY_GRAYSCALE_VALUE)
        .ok()
        .and_then(|element| element.to_int::<u16>().ok())
    {
        return Ok(DisplayValue::Scalar(value));
    }

    let encoded = item
        .element(tags::RECOMMENDED_DISPLAY_CIE_LAB_VALUE)
        .ok()
        .and_then(|element| element.to_multi_int::<u16>().ok())
        .filter(|values| values.len() >= 3)
        .ok_or(SegVolumeError::MissingRequiredElement(
            "recommended display value (grayscale or CIELab)",
        ))?;

    let (r, g, b) = cielab_to_rgb([encoded[0], encoded[1], encoded[2]]);
    Ok(DisplayValue::Rgb { r, g, b })
}

/// Converts a PCS-encoded CIELab triple to sRGB. The unsigned encoding maps
/// 0..=65535 onto L* 0..100 and a*/b* -128..127; the Lab value then goes
/// through XYZ (D65) and the sRGB transfer function.
pub(crate) fn cielab_to_rgb(encoded: [u16; 3]) -> (u8, u8, u8) {
    let l = f64::from(encoded[0]) * 100.0 / 65535.0;
    let a = f64::from(encoded[1]) * 255.0 / 65535.0 - 128.0;
    let b = f64::from(encoded[2]) * 255.0 / 65535.0 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = 0.95047 * lab_inverse(fx);
    let y = 1.0 * lab_inverse(fy);
    let z = 1.08883 * lab_inverse(fz);

    let red = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let green = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let blue = 0.0557 * x - 0.2040 * y + 1.0570 * z;

    (
        srgb_component(red),
        srgb_component(green),
        srgb_component(blue),
    )
}

fn lab_inverse(t: f64) -> f64 {
    const DELTA: f64 = 6.0 / 29.0;
    if t > DELTA {
        t * t * t
    } else {
        3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
    }
}

fn srgb_component(linear: f64) -> u8 {
    let gamma = if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (gamma.clamp(0.0, 1.0) * 255.0).round() as u8
}
