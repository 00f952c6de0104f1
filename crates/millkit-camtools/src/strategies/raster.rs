//! Zig-zag raster passes clipped to a 2D region.
//!
//! The region is rotated so scan lines run along X, each line is cut at its
//! crossings with every region loop (even-odd), and the spans are rotated
//! back. Alternate lines are reversed. When a drive surface is given the
//! spans are resampled and every sample is dropped onto it.

use crate::error::{CamToolError, CamToolResult, ParameterError};
use millkit_core::{Path, ToolSettings};
use millkit_geometry::{region_loops, MeshSurface, Region};
use millkit_settings::JobConfig;
use nalgebra::Point3;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RasterParams {
    pub tool: ToolSettings,
    /// Scan direction in degrees from +X.
    pub angle: f64,
    /// Cutting height when no drive surface is used.
    pub z: f64,
    /// Height kept above the drive surface.
    pub vertical_allowance: f64,
    /// Sample spacing along a span when dropping onto the drive.
    pub sample_step: f64,
}

impl RasterParams {
    pub fn new(tool: ToolSettings, angle: f64, z: f64) -> Self {
        let sample_step = (tool.step_over / 2.0).max(0.1);
        Self {
            tool,
            angle,
            z,
            vertical_allowance: 0.0,
            sample_step,
        }
    }

    pub fn from_config(config: &JobConfig, angle: f64) -> Self {
        let defaults = Self::new(config.tool.clone(), angle, config.finishing.raster_z);
        Self {
            vertical_allowance: config.clearance.vertical_allowance,
            sample_step: config
                .finishing
                .raster_sample_step
                .unwrap_or(defaults.sample_step),
            ..defaults
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        ParameterError::require_positive("sample_step", self.sample_step)?;
        if !self.angle.is_finite() {
            return Err(ParameterError::InvalidValue {
                name: "angle".to_string(),
                reason: "must be finite".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RasterPlanner {
    params: RasterParams,
}

impl RasterPlanner {
    pub fn new(params: RasterParams) -> Self {
        Self { params }
    }

    pub fn plan(&self, region: &Region, drive: Option<&MeshSurface>) -> CamToolResult<Vec<Path>> {
        if region.0.is_empty() {
            return Err(CamToolError::MissingGeometry("raster region is empty".to_string()));
        }
        self.params.validate()?;

        let (sin, cos) = self.params.angle.to_radians().sin_cos();
        let to_scan = |x: f64, y: f64| (x * cos + y * sin, -x * sin + y * cos);
        let from_scan = |u: f64, v: f64| (u * cos - v * sin, u * sin + v * cos);

        let loops: Vec<Vec<(f64, f64)>> = region_loops(region)
            .iter()
            .map(|ring| ring.coords().map(|c| to_scan(c.x, c.y)).collect())
            .collect();

        let (v_min, v_max) = loops
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });

        let step = self.params.tool.step_over;
        let mut paths = Vec::new();
        let mut forward = true;
        let mut v = v_min + step / 2.0;
        while v < v_max {
            let mut spans = scan_spans(&loops, v);
            if !forward {
                spans.reverse();
            }
            for (u0, u1) in spans {
                let (start, end) = if forward { (u0, u1) } else { (u1, u0) };
                let a = from_scan(start, v);
                let b = from_scan(end, v);
                paths.push(self.span_path(a, b, drive));
            }
            forward = !forward;
            v += step;
        }

        debug!("Raster scan v = [{:.3}, {:.3}]", v_min, v_max);
        info!("Raster at {:.1} deg: {} passes", self.params.angle, paths.len());
        Ok(paths)
    }

    fn span_path(&self, a: (f64, f64), b: (f64, f64), drive: Option<&MeshSurface>) -> Path {
        let Some(surface) = drive else {
            return Path::from_points([
                Point3::new(a.0, a.1, self.params.z),
                Point3::new(b.0, b.1, self.params.z),
            ]);
        };

        let length = (b.0 - a.0).hypot(b.1 - a.1);
        let samples = (length / self.params.sample_step).ceil().max(1.0) as usize;
        Path::from_points((0..=samples).map(|i| {
            let t = i as f64 / samples as f64;
            let x = a.0 + (b.0 - a.0) * t;
            let y = a.1 + (b.1 - a.1) * t;
            let z = surface
                .height_at(x, y)
                .map_or(self.params.z, |h| h + self.params.vertical_allowance);
            Point3::new(x, y, z)
        }))
    }
}

/// Inside spans of the horizontal line at `v`, sorted along the line.
fn scan_spans(loops: &[Vec<(f64, f64)>], v: f64) -> Vec<(f64, f64)> {
    let mut crossings: Vec<f64> = loops
        .iter()
        .flat_map(|ring| ring.iter().zip(ring.iter().skip(1)))
        .filter(|(p, q)| (p.1 <= v) != (q.1 <= v))
        .map(|(p, q)| p.0 + (v - p.1) * (q.0 - p.0) / (q.1 - p.1))
        .collect();
    crossings.sort_by(f64::total_cmp);
    crossings
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(a, b)| b > a)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};
    use millkit_geometry::clipper::rectangle;
    use millkit_geometry::Mesh3D;

    #[test]
    fn test_zig_zag_over_rectangle() {
        let planner = RasterPlanner::new(RasterParams::new(
            ToolSettings::end_mill(2.0, 2.0, 1.0),
            0.0,
            -1.0,
        ));
        let paths = planner.plan(&rectangle((0.0, 0.0), (10.0, 8.0)), None).unwrap();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0].first().unwrap().frame.origin.x, 0.0);
        assert_eq!(paths[1].first().unwrap().frame.origin.x, 10.0);
        assert_eq!(paths[1].first().unwrap().frame.origin.y, 3.0);
        assert!(paths.iter().all(|p| p.positions().all(|q| q.z == -1.0)));
    }

    #[test]
    fn test_from_config_reads_finishing_section() {
        let mut config = JobConfig::default();
        config.finishing.raster_z = -1.25;
        config.pocket.target_z = -7.0;
        let params = RasterParams::from_config(&config, 30.0);
        assert_eq!(params.z, -1.25);
        assert_eq!(params.sample_step, (config.tool.step_over / 2.0).max(0.1));

        config.finishing.raster_sample_step = Some(0.3);
        assert_eq!(RasterParams::from_config(&config, 30.0).sample_step, 0.3);
    }

    #[test]
    fn test_hole_splits_scan_line() {
        let region = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 4.0), (0.0, 4.0)]),
            vec![LineString::from(vec![
                (4.0, 1.0),
                (6.0, 1.0),
                (6.0, 3.0),
                (4.0, 3.0),
            ])],
        )]);
        let planner = RasterPlanner::new(RasterParams::new(
            ToolSettings::end_mill(2.0, 2.0, 1.0),
            0.0,
            0.0,
        ));
        let paths = planner.plan(&region, None).unwrap();
        // v = 1 is split by the hole, v = 3 runs along its top edge.
        assert_eq!(paths.len(), 3);
        assert!(paths
            .iter()
            .all(|p| p.positions().all(|q| !(q.x > 4.0 && q.x < 6.0 && q.y > 1.0 && q.y < 3.0))));
    }

    #[test]
    fn test_drop_onto_drive() {
        let drive = Mesh3D::cuboid(Point3::new(-5.0, -5.0, 0.0), Point3::new(15.0, 15.0, 3.0));
        let surface = MeshSurface::new(&drive).unwrap();
        let mut params = RasterParams::new(ToolSettings::end_mill(2.0, 2.0, 1.0), 90.0, -10.0);
        params.vertical_allowance = 0.5;
        let paths = RasterPlanner::new(params)
            .plan(&rectangle((0.0, 0.0), (10.0, 10.0)), Some(&surface))
            .unwrap();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.len() > 2));
        assert!(paths
            .iter()
            .all(|p| p.positions().all(|q| (q.z - 3.5).abs() < 1e-6)));
    }
}
