//! Retraction, safe linking and lead assembly.
//!
//! The assembler turns the independent cutting passes of a [`Toolpath`]
//! into one continuous motion sequence. Every pass is entered and left
//! through the safety boundary; on mesh or general surface boundaries the
//! rapid move between passes follows the surface instead of cutting
//! straight across it.
//!
//! Query misses never abort assembly. The affected frame is kept as it was
//! and a warning is recorded.

use crate::diagnostics::{Diagnostics, PlanWarning};
use crate::error::{CamToolResult, ParameterError};
use crate::toolpath::Toolpath;
use millkit_core::{slerp, MotionType, OrientedFrame, Path, Waypoint};
use millkit_geometry::{SafetyBoundary, SurfaceQuery};
use millkit_settings::JobConfig;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Parameters for assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerParams {
    /// Distance a pass start/end is raised along its own tool axis.
    pub safe_height: f64,
    /// On plane boundaries, retract along the plane normal instead of the
    /// tool axis.
    pub vertical_retract: bool,
    /// Length of one link trace step.
    pub link_step: f64,
    /// Step cap for one link trace.
    pub max_link_steps: usize,
}

impl Default for AssemblerParams {
    fn default() -> Self {
        Self {
            safe_height: 5.0,
            vertical_retract: true,
            link_step: 1.0,
            max_link_steps: 2000,
        }
    }
}

impl AssemblerParams {
    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            safe_height: config.safety.safe_height,
            vertical_retract: config.safety.vertical_retract,
            link_step: config.safety.link_step,
            max_link_steps: config.safety.max_link_steps,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        ParameterError::require_non_negative("safe_height", self.safe_height)?;
        ParameterError::require_positive("link_step", self.link_step)?;
        if self.max_link_steps == 0 {
            return Err(ParameterError::InvalidValue {
                name: "max_link_steps".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Positions traced across a surface by [`ToolpathAssembler::trace_link`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTrace {
    /// Start point followed by every traced step; the target is not
    /// included.
    pub points: Vec<Point3<f64>>,
    /// True when the last traced point is within one step of the target.
    pub converged: bool,
    /// Steps at which the closest-point query failed.
    pub missed_steps: Vec<usize>,
}

/// Links cutting passes into one safe motion sequence.
#[derive(Debug, Clone)]
pub struct ToolpathAssembler {
    params: AssemblerParams,
}

impl ToolpathAssembler {
    pub fn new(params: AssemblerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AssemblerParams {
        &self.params
    }

    /// Replaces the paths of `toolpath` with a single linked sequence.
    pub fn assemble(&self, toolpath: &mut Toolpath) -> CamToolResult<Diagnostics> {
        self.params.validate()?;
        let mut diagnostics = Diagnostics::new();
        let merged = self.assemble_paths(&toolpath.paths, &toolpath.boundary, &mut diagnostics);
        toolpath.paths = vec![merged];
        toolpath.assembled = true;

        let summary = toolpath.summary();
        info!(
            "Assembled '{}': {} waypoints, rapid {:.1}, cutting {:.1}",
            toolpath.name, summary.waypoints, summary.rapid_length, summary.cutting_length
        );
        Ok(diagnostics)
    }

    /// Emits, per pass: link, retract, raised start, plunge, the pass
    /// interior, raised end and end retract. Empty passes are skipped.
    pub fn assemble_paths(
        &self,
        paths: &[Path],
        boundary: &SafetyBoundary,
        diagnostics: &mut Diagnostics,
    ) -> Path {
        let mut out = Path::new();
        let mut previous_exit: Option<OrientedFrame> = None;

        for (index, path) in paths.iter().enumerate() {
            let (Some(first), Some(last)) = (path.first(), path.last()) else {
                continue;
            };

            let start_raised = first.frame.raised(self.params.safe_height);
            let end_raised = last.frame.raised(self.params.safe_height);
            let entry = self.retract_or_keep(&start_raised, boundary, index, diagnostics);
            let exit = self.retract_or_keep(&end_raised, boundary, index, diagnostics);

            if let Some(from) = previous_exit.filter(|_| !boundary.is_plane()) {
                let link = self.link(&from, &entry, boundary.query(), index, diagnostics);
                let interior = link.len().saturating_sub(1);
                for frame in link.into_iter().take(interior).skip(1) {
                    out.push(Waypoint::rapid(frame));
                }
            }

            out.push(Waypoint::rapid(entry));
            out.push(Waypoint::feed(start_raised));
            out.push(first.with_motion(MotionType::Plunge));
            out.waypoints.extend_from_slice(&path.waypoints[1..]);
            out.push(Waypoint::feed(end_raised));
            out.push(Waypoint::rapid(exit));

            previous_exit = Some(exit);
        }

        debug!("Assembled {} passes into {} waypoints", paths.len(), out.len());
        out
    }

    fn retract_or_keep(
        &self,
        frame: &OrientedFrame,
        boundary: &SafetyBoundary,
        index: usize,
        diagnostics: &mut Diagnostics,
    ) -> OrientedFrame {
        self.retract_to_safety(frame, boundary).unwrap_or_else(|| {
            diagnostics.push(PlanWarning::RetractMissed { path_index: index });
            *frame
        })
    }

    /// Moves `frame` onto the safety boundary, keeping its orientation.
    ///
    /// `None` when the boundary is not reached along the retract direction.
    pub fn retract_to_safety(
        &self,
        frame: &OrientedFrame,
        boundary: &SafetyBoundary,
    ) -> Option<OrientedFrame> {
        let target = match boundary {
            SafetyBoundary::Plane(plane) if self.params.vertical_retract => {
                Some(plane.project(&frame.origin))
            }
            SafetyBoundary::Plane(plane) => plane.line_intersect(&frame.origin, &frame.z_axis),
            SafetyBoundary::Mesh(_) | SafetyBoundary::Surface(_) => {
                boundary.query().ray_intersect(&frame.origin, &frame.z_axis)
            }
        }?;
        Some(frame.with_origin(target))
    }

    /// Walks from `from` towards `to` across `surface`.
    ///
    /// Each step projects the remaining direction onto the tangent plane at
    /// the current closest surface point, advances one step length along it
    /// and snaps back onto the surface.
    pub fn trace_link(
        &self,
        from: &Point3<f64>,
        to: &Point3<f64>,
        surface: &dyn SurfaceQuery,
    ) -> LinkTrace {
        let step = self.params.link_step;
        let mut current = *from;
        let mut points = vec![current];
        let mut missed_steps = Vec::new();

        for index in 0..self.params.max_link_steps {
            let remaining = to - current;
            if remaining.norm() <= step {
                break;
            }

            let direction = match surface.closest_point(&current) {
                Some(sp) => {
                    let n = sp.normal.into_inner();
                    (remaining - n * n.dot(&remaining))
                        .try_normalize(f64::EPSILON)
                        .unwrap_or_else(|| remaining.normalize())
                }
                None => {
                    missed_steps.push(index);
                    remaining.normalize()
                }
            };

            let stepped = current + direction * step;
            current = match surface.closest_point(&stepped) {
                Some(sp) => sp.point,
                None => {
                    missed_steps.push(index);
                    stepped
                }
            };
            points.push(current);
        }

        let converged = (to - current).norm() <= step;
        LinkTrace {
            points,
            converged,
            missed_steps,
        }
    }

    /// Oriented rapid path from `a` to `b` over `surface`, both endpoints
    /// included.
    ///
    /// Orientation is slerped from `a` to `b` by travelled distance and
    /// eased towards the surface normal, fully at mid-link and not at all
    /// at either end.
    pub fn link(
        &self,
        a: &OrientedFrame,
        b: &OrientedFrame,
        surface: &dyn SurfaceQuery,
        path_index: usize,
        diagnostics: &mut Diagnostics,
    ) -> Vec<OrientedFrame> {
        let trace = self.trace_link(&a.origin, &b.origin, surface);
        if let Some(&step) = trace.missed_steps.first() {
            diagnostics.push(PlanWarning::ClosestPointMissed { path_index, step });
        }
        if !trace.converged {
            let remaining = trace
                .points
                .last()
                .map_or(0.0, |p| (b.origin - p).norm());
            diagnostics.push(PlanWarning::LinkNotConverged {
                path_index,
                remaining,
            });
        }

        let mut positions = trace.points;
        if positions.last() != Some(&b.origin) {
            positions.push(b.origin);
        }

        let mut cumulative = Vec::with_capacity(positions.len());
        let mut total = 0.0;
        for (i, p) in positions.iter().enumerate() {
            if i > 0 {
                total += (p - positions[i - 1]).norm();
            }
            cumulative.push(total);
        }

        let qa = a.rotation();
        let qb = b.rotation();
        let last = positions.len() - 1;

        positions
            .iter()
            .zip(&cumulative)
            .enumerate()
            .map(|(i, (p, &travelled))| {
                if i == 0 {
                    return *a;
                }
                if i == last {
                    return *b;
                }
                let t = if total > 0.0 { travelled / total } else { 0.0 };
                let q = slerp(&qa, &qb, t);
                let q = match surface.closest_point(p) {
                    Some(sp) => blend_towards_normal(&q, &sp.normal.into_inner(), t),
                    None => q,
                };
                OrientedFrame::from_rotation(*p, &q)
            })
            .collect()
    }
}

/// Eases `q` towards the orientation whose tool axis matches `normal`,
/// weighted by `sin(pi * t)`.
fn blend_towards_normal(q: &UnitQuaternion<f64>, normal: &Vector3<f64>, t: f64) -> UnitQuaternion<f64> {
    let axis = q * Vector3::z();
    let normal = if normal.dot(&axis) < 0.0 { -normal } else { *normal };
    match UnitQuaternion::rotation_between(&axis, &normal) {
        Some(align) => slerp(q, &(align * q), (PI * t).sin()),
        None => *q,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millkit_core::ToolSettings;
    use millkit_geometry::SafetyPlane;

    fn pass(x0: f64, x1: f64, z: f64) -> Path {
        Path::from_points([
            Point3::new(x0, 0.0, z),
            Point3::new((x0 + x1) / 2.0, 0.0, z),
            Point3::new(x1, 0.0, z),
        ])
    }

    #[test]
    fn test_emit_order_on_plane() {
        let assembler = ToolpathAssembler::new(AssemblerParams::default());
        let boundary: SafetyBoundary = SafetyPlane::horizontal(25.0).into();
        let mut diagnostics = Diagnostics::new();
        let out = assembler.assemble_paths(&[pass(0.0, 10.0, -2.0)], &boundary, &mut diagnostics);

        let motions: Vec<MotionType> = out.iter().map(|w| w.motion()).collect();
        assert_eq!(
            motions,
            vec![
                MotionType::Rapid,
                MotionType::Feed,
                MotionType::Plunge,
                MotionType::Feed,
                MotionType::Feed,
                MotionType::Feed,
                MotionType::Rapid,
            ]
        );
        let z: Vec<f64> = out.positions().map(|p| p.z).collect();
        assert_eq!(z, vec![25.0, 3.0, -2.0, -2.0, -2.0, 3.0, 25.0]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_no_link_between_passes_on_plane() {
        let assembler = ToolpathAssembler::new(AssemblerParams::default());
        let boundary: SafetyBoundary = SafetyPlane::horizontal(25.0).into();
        let out = assembler.assemble_paths(
            &[pass(0.0, 10.0, 0.0), Path::new(), pass(20.0, 30.0, 0.0)],
            &boundary,
            &mut Diagnostics::new(),
        );
        assert_eq!(out.len(), 14);
        assert_eq!(out.waypoints[7].position(), Point3::new(20.0, 0.0, 25.0));
    }

    #[test]
    fn test_non_vertical_plane_retract_parallel_axis_is_missed() {
        let assembler = ToolpathAssembler::new(AssemblerParams {
            vertical_retract: false,
            ..AssemblerParams::default()
        });
        let boundary: SafetyBoundary = SafetyPlane::horizontal(25.0).into();
        let sideways =
            OrientedFrame::from_normal(Point3::new(0.0, 0.0, 0.0), Vector3::x()).unwrap();
        assert!(assembler.retract_to_safety(&sideways, &boundary).is_none());

        let mut diagnostics = Diagnostics::new();
        let path = Path::from_frames([sideways, sideways.translated(&Vector3::y())], MotionType::Feed);
        let out = assembler.assemble_paths(&[path], &boundary, &mut diagnostics);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(out.waypoints[0].position(), Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_assemble_marks_toolpath() {
        let assembler = ToolpathAssembler::new(AssemblerParams::default());
        let mut toolpath = Toolpath::new(
            "p",
            ToolSettings::default(),
            SafetyPlane::horizontal(25.0).into(),
            25.0,
            5.0,
        )
        .with_paths(vec![pass(0.0, 1.0, 0.0), pass(2.0, 3.0, 0.0)]);
        let diagnostics = assembler.assemble(&mut toolpath).unwrap();
        assert!(diagnostics.is_empty());
        assert!(toolpath.assembled);
        assert_eq!(toolpath.paths.len(), 1);
        assert_eq!(toolpath.paths[0].len(), 14);
    }

    #[test]
    fn test_blend_weight_vanishes_at_ends() {
        let q = UnitQuaternion::from_euler_angles(0.4, 0.0, 0.0);
        let n = Vector3::new(0.0, 1.0, 1.0).normalize();
        assert!(blend_towards_normal(&q, &n, 0.0).angle_to(&q) < 1e-12);
        let mid = blend_towards_normal(&q, &n, 0.5);
        assert!(((mid * Vector3::z()) - n).norm() < 1e-9);
    }
}
