//! Layer height schedules.

/// Heights of `ceil(depth / step_down)` equally spaced layers below `top`.
///
/// The step is shrunk so the last layer lands exactly on `top - depth`;
/// `top` itself is not included.
pub fn equal_step_layers(top: f64, depth: f64, step_down: f64) -> Vec<f64> {
    if depth.is_nan() || step_down.is_nan() || depth <= 0.0 || step_down <= 0.0 {
        return Vec::new();
    }
    let count = (depth / step_down - 1e-9).ceil().max(1.0) as usize;
    let step = depth / count as f64;
    (1..=count).map(|i| top - i as f64 * step).collect()
}

/// Heights `top - k * step_down` strictly above `target`, followed by one
/// final pass at exactly `target`.
pub fn stepped_passes(top: f64, target: f64, step_down: f64) -> Vec<f64> {
    if step_down.is_nan() || step_down <= 0.0 || target.is_nan() || target >= top {
        return Vec::new();
    }
    let mut heights: Vec<f64> = (1..)
        .map(|k| top - k as f64 * step_down)
        .take_while(|&z| z > target + 1e-9)
        .collect();
    heights.push(target);
    heights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_step_layers_exact_division() {
        assert_eq!(
            equal_step_layers(50.0, 50.0, 10.0),
            vec![40.0, 30.0, 20.0, 10.0, 0.0]
        );
    }

    #[test]
    fn test_equal_step_layers_shrinks_step() {
        let layers = equal_step_layers(10.0, 9.0, 4.0);
        assert_eq!(layers.len(), 3);
        assert!((layers[0] - 7.0).abs() < 1e-12);
        assert!((layers[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_stepped_passes() {
        assert_eq!(stepped_passes(0.0, -5.0, 2.0), vec![-2.0, -4.0, -5.0]);
        assert_eq!(stepped_passes(0.0, -6.0, 2.0), vec![-2.0, -4.0, -6.0]);
        assert_eq!(stepped_passes(0.0, -1.0, 2.0), vec![-1.0]);
        assert!(stepped_passes(0.0, 1.0, 2.0).is_empty());
    }
}
