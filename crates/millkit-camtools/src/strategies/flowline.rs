//! Passes interpolated between two guide rails.
//!
//! Both rails are resampled to the same number of points by arc length and
//! the passes sweep the ruled surface between them. Each sample takes its
//! tool axis from the drive surface normal when a drive is given.

use crate::error::{CamToolError, CamToolResult, ParameterError};
use millkit_core::{MotionType, OrientedFrame, Path, ToolSettings};
use millkit_geometry::SurfaceQuery;
use millkit_settings::JobConfig;
use nalgebra::Point3;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowlineParams {
    pub tool: ToolSettings,
    /// Spacing of samples along the longer rail.
    pub sample_step: f64,
}

impl FlowlineParams {
    pub fn new(tool: ToolSettings) -> Self {
        Self {
            tool,
            sample_step: 1.0,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            sample_step: config.finishing.flowline_sample_step,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        ParameterError::require_positive("sample_step", self.sample_step)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FlowlinePlanner {
    params: FlowlineParams,
}

impl FlowlinePlanner {
    pub fn new(params: FlowlineParams) -> Self {
        Self { params }
    }

    /// Zig-zag passes from `rail_a` to `rail_b`, spaced by at most the
    /// step-over.
    pub fn plan(
        &self,
        rail_a: &[Point3<f64>],
        rail_b: &[Point3<f64>],
        drive: Option<&dyn SurfaceQuery>,
    ) -> CamToolResult<Vec<Path>> {
        if rail_a.len() < 2 || rail_b.len() < 2 {
            return Err(CamToolError::MissingGeometry(
                "flowline rails need at least two points each".to_string(),
            ));
        }
        self.params.validate()?;

        let longest = polyline_length(rail_a).max(polyline_length(rail_b));
        let samples = (longest / self.params.sample_step).ceil().max(1.0) as usize + 1;
        let a = resample(rail_a, samples);
        let b = resample(rail_b, samples);

        let spread = a
            .iter()
            .zip(&b)
            .map(|(p, q)| (q - p).norm())
            .fold(0.0, f64::max);
        let passes = (spread / self.params.tool.step_over).ceil() as usize + 1;

        let paths: Vec<Path> = (0..passes)
            .map(|i| {
                let t = if passes > 1 {
                    i as f64 / (passes - 1) as f64
                } else {
                    0.0
                };
                let points = a.iter().zip(&b).map(move |(p, q)| p + (q - p) * t);
                let mut path = Path::from_frames(points.map(|p| orient(p, drive)), MotionType::Feed);
                if i % 2 == 1 {
                    path.reverse();
                }
                path
            })
            .collect();

        info!("Flowline: {} passes of {} samples", paths.len(), samples);
        Ok(paths)
    }
}

/// Frame at `point` with its tool axis along the drive normal, pointing up
/// where the normal allows.
fn orient(point: Point3<f64>, drive: Option<&dyn SurfaceQuery>) -> OrientedFrame {
    drive
        .and_then(|surface| surface.closest_point(&point))
        .and_then(|sp| {
            let n = sp.normal.into_inner();
            let n = if n.z < 0.0 { -n } else { n };
            OrientedFrame::from_normal(point, n)
        })
        .unwrap_or_else(|| OrientedFrame::world_xy(point))
}

fn polyline_length(points: &[Point3<f64>]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// `count` points evenly spaced by arc length along `points`, endpoints
/// included.
pub fn resample(points: &[Point3<f64>], count: usize) -> Vec<Point3<f64>> {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if count < 2 {
        return vec![first];
    }
    let total = polyline_length(points);
    if total <= f64::EPSILON {
        return vec![first; count];
    }

    let mut out = Vec::with_capacity(count);
    let mut segment = 0;
    let mut walked = 0.0;
    for i in 0..count - 1 {
        let target = total * i as f64 / (count - 1) as f64;
        while segment + 2 < points.len()
            && walked + (points[segment + 1] - points[segment]).norm() < target
        {
            walked += (points[segment + 1] - points[segment]).norm();
            segment += 1;
        }
        let p = points[segment];
        let q = points[segment + 1];
        let length = (q - p).norm();
        let t = if length > 0.0 {
            ((target - walked) / length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(p + (q - p) * t);
    }
    out.push(last);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use millkit_geometry::SafetyPlane;
    use nalgebra::Vector3;

    #[test]
    fn test_resample_by_arc_length() {
        let rail = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let points = resample(&rail, 5);
        assert_eq!(points.len(), 5);
        for (i, p) in points.iter().enumerate() {
            assert!((p.x - i as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sample_step_ignores_link_step() {
        let mut config = JobConfig::default();
        config.safety.link_step = 7.0;
        config.finishing.flowline_sample_step = 0.5;
        assert_eq!(FlowlineParams::from_config(&config).sample_step, 0.5);
    }

    #[test]
    fn test_passes_between_rails_zig_zag() {
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
        let b = [Point3::new(0.0, 6.0, 0.0), Point3::new(10.0, 6.0, 0.0)];
        let planner = FlowlinePlanner::new(FlowlineParams::new(ToolSettings::end_mill(4.0, 2.0, 1.0)));
        let paths = planner.plan(&a, &b, None).unwrap();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0].len(), 11);
        let start = paths[1].first().unwrap().frame.origin;
        assert!((start - Point3::new(10.0, 2.0, 0.0)).norm() < 1e-9);
        assert_eq!(paths[3].last().unwrap().frame.origin, Point3::new(0.0, 6.0, 0.0));
    }

    #[test]
    fn test_frames_follow_drive_normal() {
        let tilted = SafetyPlane::new(Point3::origin(), Vector3::new(1.0, 0.0, 1.0)).unwrap();
        let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 4.0, 0.0)];
        let b = [Point3::new(1.0, 0.0, -1.0), Point3::new(1.0, 4.0, -1.0)];
        let planner = FlowlinePlanner::new(FlowlineParams::new(ToolSettings::end_mill(4.0, 2.0, 1.0)));
        let paths = planner.plan(&a, &b, Some(&tilted as &dyn SurfaceQuery)).unwrap();
        let expected = Vector3::new(1.0, 0.0, 1.0).normalize();
        for waypoint in paths.iter().flat_map(|p| p.iter()) {
            assert!((waypoint.frame.z_axis - expected).norm() < 1e-9);
        }
        assert!(planner.plan(&a[..1], &b, None).is_err());
    }
}
