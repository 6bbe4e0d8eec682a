//! Shared helpers for locating points on grids.

use ndarray::ArrayView2;

/// The cell `[i, i + 1]` containing `coord` and the fraction across it.
///
/// Works for increasing and decreasing coordinates. Returns `None` outside
/// the coordinate range; a coordinate equal to the last node lands in the
/// last cell with fraction 1.
pub fn locate_cell(coord: f64, coords: &[f64]) -> Option<(usize, f64)> {
    if coords.len() < 2 || !coord.is_finite() {
        return None;
    }
    let ascending = coords[coords.len() - 1] >= coords[0];
    let (lo, hi) = if ascending {
        (coords[0], coords[coords.len() - 1])
    } else {
        (coords[coords.len() - 1], coords[0])
    };
    if coord < lo || coord > hi {
        return None;
    }

    let upper = if ascending {
        coords.partition_point(|&c| c <= coord)
    } else {
        coords.partition_point(|&c| c >= coord)
    };
    let i = upper.saturating_sub(1).min(coords.len() - 2);
    let span = coords[i + 1] - coords[i];
    let frac = if span == 0.0 { 0.0 } else { (coord - coords[i]) / span };
    Some((i, clamp_fraction(frac)))
}

/// Get the weight for linear interpolation
pub fn linear_weight(fraction: f64) -> (f64, f64) {
    (1.0 - fraction, fraction)
}

fn clamp_fraction(frac: f64) -> f64 {
    frac.clamp(0.0, 1.0)
}

/// Check that query points have at least two columns
pub fn check_points(points: &ArrayView2<f64>) -> crate::error::Result<()> {
    if points.ncols() < 2 {
        return Err(crate::error::GridPropError::dimension(format!(
            "Query points must be N×2 or N×3, got N×{}",
            points.ncols()
        )));
    }
    Ok(())
}

/// Whether coordinates are strictly monotonic in either direction
pub fn is_strictly_monotonic(coords: &[f64]) -> bool {
    coords.windows(2).all(|w| w[1] > w[0]) || coords.windows(2).all(|w| w[1] < w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_weight() {
        let (w0, w1) = linear_weight(0.3);
        assert!((w0 - 0.7).abs() < 1e-10);
        assert!((w1 - 0.3).abs() < 1e-10);
        assert!((w0 + w1 - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_locate_cell_ascending() {
        let coords = [0.0, 10.0, 20.0, 40.0];
        assert_eq!(locate_cell(0.0, &coords), Some((0, 0.0)));
        assert_eq!(locate_cell(5.0, &coords), Some((0, 0.5)));
        assert_eq!(locate_cell(30.0, &coords), Some((2, 0.5)));
        assert_eq!(locate_cell(40.0, &coords), Some((2, 1.0)));
        assert_eq!(locate_cell(-0.1, &coords), None);
        assert_eq!(locate_cell(40.1, &coords), None);
    }

    #[test]
    fn test_locate_cell_descending() {
        let coords = [60.0, 50.0, 40.0];
        assert_eq!(locate_cell(60.0, &coords), Some((0, 0.0)));
        assert_eq!(locate_cell(55.0, &coords), Some((0, 0.5)));
        assert_eq!(locate_cell(40.0, &coords), Some((1, 1.0)));
        assert_eq!(locate_cell(39.0, &coords), None);
    }

    #[test]
    fn test_locate_cell_rejects_nan() {
        assert_eq!(locate_cell(f64::NAN, &[0.0, 1.0]), None);
        assert_eq!(locate_cell(0.5, &[0.0]), None);
    }

    #[test]
    fn test_check_points() {
        assert!(check_points(&array![[1.0, 2.0]].view()).is_ok());
        assert!(check_points(&array![[1.0], [2.0]].view()).is_err());
    }

    #[test]
    fn test_monotonic() {
        assert!(is_strictly_monotonic(&[1.0, 2.0, 3.0]));
        assert!(is_strictly_monotonic(&[3.0, 2.0]));
        assert!(!is_strictly_monotonic(&[1.0, 1.0]));
        assert!(!is_strictly_monotonic(&[1.0, 3.0, 2.0]));
    }
}
