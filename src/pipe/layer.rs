/// One concentric layer of a pipe: its outer radius and what fills it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderLayer {
    /// Outer radius of the layer.
    pub radius: f64,
    /// Material number (`0` for void).
    pub material: i32,
    /// Temperature in kelvin (`0` for the default).
    pub temperature: f64,
}

impl CylinderLayer {
    /// Creates a new layer.
    #[must_use]
    pub fn new(radius: f64, material: i32, temperature: f64) -> Self {
        Self {
            radius,
            material,
            temperature,
        }
    }
}

/// Returns `true` if layer `index` is realized under `mask`.
///
/// A zero mask realizes every layer; otherwise bit `i` guards layer `i`.
#[must_use]
pub fn layer_active(mask: u32, index: usize) -> bool {
    mask == 0
        || u32::try_from(index)
            .ok()
            .and_then(|i| 1u32.checked_shl(i))
            .is_some_and(|bit| mask & bit != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mask_activates_everything() {
        assert!((0..40).all(|i| layer_active(0, i)));
    }

    #[test]
    fn bits_guard_layers() {
        assert!(layer_active(0b101, 0));
        assert!(!layer_active(0b101, 1));
        assert!(layer_active(0b101, 2));
        assert!(!layer_active(0b101, 3));
        assert!(!layer_active(0b1, 32));
    }
}
