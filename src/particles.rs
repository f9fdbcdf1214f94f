//! Deterministic placement for decorative floating particles.
//!
//! Positions are a pure function of the particle index, so a server render
//! and a client render lay particles out identically.

const X_MULTIPLIER: u64 = 1_234_567;
const Y_MULTIPLIER: u64 = 7_654_321;

/// Pseudo-random seeds in `0.0..1.0` (steps of 0.01) for particle `index`.
#[inline]
pub fn particle_seed(index: usize) -> (f64, f64) {
    let i = index as u64;
    let x = i.wrapping_mul(X_MULTIPLIER) % 100;
    let y = i.wrapping_mul(Y_MULTIPLIER) % 100;
    (x as f64 / 100.0, y as f64 / 100.0)
}

/// Position of particle `index` inside a `width` x `height` area.
///
/// ```rust
/// use scrollframe_core_view::particle_position;
///
/// assert_eq!(particle_position(0, 1920.0, 1080.0), (0.0, 0.0));
/// assert_eq!(particle_position(1, 100.0, 100.0), (67.0, 21.0));
/// ```
pub fn particle_position(index: usize, width: f64, height: f64) -> (f64, f64) {
    let (x, y) = particle_seed(index);
    (x * width, y * height)
}

/// Positions for the first `count` particles.
pub fn particle_layout(count: usize, width: f64, height: f64) -> Vec<(f64, f64)> {
    (0..count)
        .map(|i| particle_position(i, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_seeds() {
        assert_eq!(particle_seed(1), (0.67, 0.21));
        assert_eq!(particle_seed(2), (0.34, 0.42));
        assert_eq!(particle_seed(3), (0.01, 0.63));
    }

    #[test]
    fn test_deterministic() {
        let a = particle_layout(40, 1366.0, 768.0);
        let b = particle_layout(40, 1366.0, 768.0);
        assert_eq!(a, b);
        for &(x, y) in &a {
            assert!((0.0..1366.0).contains(&x));
            assert!((0.0..768.0).contains(&y));
        }
    }
}
