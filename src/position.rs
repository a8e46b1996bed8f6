use std::cmp::Ordering;

/// A frame origin in the patient coordinate system (x, y, z in mm).
pub type PatientPosition = [f64; 3];

/// Structural equality over patient positions: all three components must
/// match exactly. No floating-point tolerance is applied, callers that need
/// fuzzy matching must round before comparing.
pub fn same_position(a: &PatientPosition, b: &PatientPosition) -> bool {
    a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
}

/// Compares two patient positions starting from the last axis, yielding a
/// *descending* order on z with ties broken by y and then x, also
/// descending. Slice sets sorted with this comparator run from the most
/// superior slice downwards, which the gap-fill walk relies on.
pub fn compare_positions(a: &PatientPosition, b: &PatientPosition) -> Ordering {
    for i in (0..3).rev() {
        let order = b[i].partial_cmp(&a[i]).unwrap_or(Ordering::Equal);
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

/// Bit-exact key for a position, usable in hash maps. Two keys are equal
/// exactly when [`same_position`] holds for the originals; negative zero is
/// normalized so `0.0` and `-0.0` (equal as floats) share a key.
pub(crate) fn position_key(position: &PatientPosition) -> [u64; 3] {
    fn component_bits(value: f64) -> u64 {
        if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
    }
    [
        component_bits(position[0]),
        component_bits(position[1]),
        component_bits(position[2]),
    ]
}
