//! Boundary-driven pocketing with island splitting.
//!
//! Boundary curves are first nested by containment: a curve inside a
//! pocket boundary is a boss the tool stays clear of, a curve inside a
//! boss is another pocket. Each pocket is shrunk by the step-over, its
//! bosses grown, until no material is left. While the
//! shrink yields one loop the loops stack up as rings of the current
//! island; when a narrow neck pinches off, every resulting loop starts a
//! child island that is shrunk independently. Islands live in an arena and
//! refer to their children by index.
//!
//! Linking runs only once the whole tree is built. It walks the tree from
//! each root and splices boundary, rings and child spirals into a single
//! continuous path, entering every loop at its point closest to where the
//! previous one ended. Moves between split pieces that would cross a boss
//! follow the boss outline instead.

use crate::diagnostics::{Diagnostics, PlanWarning};
use crate::error::{CamToolError, CamToolResult, ParameterError};
use crate::layers::stepped_passes;
use geo::{Coord, Intersects, Line, LineString, Polygon};
use millkit_core::{Path, ToolSettings};
use millkit_geometry::contours::closest_index;
use millkit_geometry::{BoundaryCurve, BoundaryShape};
use millkit_settings::JobConfig;
use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, info};

/// Parameters for a pocketing run.
#[derive(Debug, Clone, PartialEq)]
pub struct PocketParams {
    pub tool: ToolSettings,
    pub top_z: f64,
    pub target_z: f64,
    /// Material left on the pocket walls.
    pub wall_allowance: f64,
    pub loop_limit: usize,
    /// Chord error allowed when flattening arcs.
    pub flatten_tolerance: f64,
}

impl PocketParams {
    pub fn new(tool: ToolSettings, top_z: f64, target_z: f64) -> Self {
        Self {
            tool,
            top_z,
            target_z,
            wall_allowance: 0.0,
            loop_limit: 500,
            flatten_tolerance: 0.01,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            top_z: config.pocket.top_z,
            target_z: config.pocket.target_z,
            wall_allowance: config.pocket.wall_allowance,
            loop_limit: config.kernel.loop_limit,
            flatten_tolerance: config.kernel.tolerance.max(1e-4) * 10.0,
        }
    }

    pub fn validate(&self) -> CamToolResult<()> {
        self.tool.validate()?;
        ParameterError::require_non_negative("wall_allowance", self.wall_allowance)?;
        ParameterError::require_positive("flatten_tolerance", self.flatten_tolerance)?;
        if self.target_z.is_nan() || self.target_z >= self.top_z {
            return Err(ParameterError::InvalidValue {
                name: "target_z".to_string(),
                reason: format!("must be below top_z ({})", self.top_z),
            }
            .into());
        }
        if self.loop_limit == 0 {
            return Err(ParameterError::InvalidValue {
                name: "loop_limit".to_string(),
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Chord error used when deciding which curves enclose which.
const CONTAINMENT_TOLERANCE: f64 = 0.01;

/// One island: a boundary with its bosses, its nested rings and its split
/// children.
#[derive(Debug, Clone)]
pub struct IslandRecord {
    pub boundary: BoundaryShape,
    pub rings: Vec<BoundaryShape>,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

/// Arena of islands built by repeated offsetting.
#[derive(Debug, Clone, Default)]
pub struct IslandTree {
    pub islands: Vec<IslandRecord>,
    pub roots: Vec<usize>,
    /// Number of offsets that produced more than one loop.
    pub split_events: usize,
    /// Offsets performed across the whole tree.
    pub iterations: usize,
    pub limit_reached: bool,
}

impl IslandTree {
    /// Shrinks every boundary by `first_offset`, then by `step_over` until
    /// nothing is left or `loop_limit` offsets have been made.
    pub fn build(
        boundaries: &[BoundaryCurve],
        first_offset: f64,
        step_over: f64,
        loop_limit: usize,
    ) -> Self {
        let mut tree = IslandTree::default();
        let mut pending = Vec::new();

        for shape in BoundaryShape::nest(boundaries, CONTAINMENT_TOLERANCE) {
            for start in shape.offset_inward(first_offset, CONTAINMENT_TOLERANCE) {
                let id = tree.add(start, None);
                tree.roots.push(id);
                pending.push(id);
            }
        }
        pending.reverse();

        while let Some(id) = pending.pop() {
            let mut current = tree.islands[id].boundary.clone();
            loop {
                if tree.iterations >= loop_limit {
                    tree.limit_reached = true;
                    return tree;
                }
                tree.iterations += 1;

                let mut next = current.offset_inward(step_over, CONTAINMENT_TOLERANCE);
                match next.len() {
                    0 => break,
                    1 => {
                        if let Some(ring) = next.pop() {
                            tree.islands[id].rings.push(ring.clone());
                            current = ring;
                        }
                    }
                    _ => {
                        tree.split_events += 1;
                        let children: Vec<usize> =
                            next.into_iter().map(|loop_| tree.add(loop_, Some(id))).collect();
                        debug!("Island {} split into {} children", id, children.len());
                        // Children are processed in order, before any sibling of `id`.
                        pending.extend(children.iter().rev().copied());
                        tree.islands[id].children = children;
                        break;
                    }
                }
            }
        }

        tree
    }

    fn add(&mut self, boundary: BoundaryShape, parent: Option<usize>) -> usize {
        self.islands.push(IslandRecord {
            boundary,
            rings: Vec::new(),
            children: Vec::new(),
            parent,
        });
        self.islands.len() - 1
    }

    /// Total loops to cut across every boundary and ring.
    pub fn loop_count(&self) -> usize {
        self.islands
            .iter()
            .map(|i| {
                std::iter::once(&i.boundary)
                    .chain(i.rings.iter())
                    .map(BoundaryShape::loop_count)
                    .sum::<usize>()
            })
            .sum()
    }

    /// One continuous point sequence per root island.
    pub fn link(&self, tolerance: f64) -> Vec<Vec<(f64, f64)>> {
        self.roots
            .iter()
            .map(|&root| {
                let mut out = Vec::new();
                let entry = self.islands[root]
                    .boundary
                    .outer
                    .flatten(tolerance)
                    .first()
                    .copied()
                    .unwrap_or((0.0, 0.0));
                self.link_island(root, entry, tolerance, &mut out);
                out
            })
            .collect()
    }

    fn link_island(&self, id: usize, entry: (f64, f64), tolerance: f64, out: &mut Vec<(f64, f64)>) {
        let island = &self.islands[id];
        let mut from = entry;
        let shapes = std::iter::once(&island.boundary).chain(island.rings.iter());
        for curve in shapes.flat_map(|shape| shape.loops()) {
            from = splice_loop(&curve.flatten(tolerance), from, out);
        }
        if island.children.is_empty() {
            return;
        }

        // Bosses of the last ring: moves between children go around them.
        let last = island.rings.last().unwrap_or(&island.boundary);
        let bosses: Vec<Vec<(f64, f64)>> =
            last.holes.iter().map(|h| h.flatten(tolerance)).collect();
        for &child in &island.children {
            let target = self.islands[child]
                .boundary
                .outer
                .flatten(tolerance)
                .into_iter()
                .min_by(|a, b| distance(*a, from).total_cmp(&distance(*b, from)));
            if let Some(target) = target {
                for boss in &bosses {
                    if blocks(boss, from, target) {
                        out.extend(detour(boss, from, target));
                        from = out.last().copied().unwrap_or(from);
                    }
                }
            }
            self.link_island(child, from, tolerance, out);
            from = out.last().copied().unwrap_or(from);
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// True when the straight move from `a` to `b` touches the boss outline.
fn blocks(boss: &[(f64, f64)], a: (f64, f64), b: (f64, f64)) -> bool {
    let outline: LineString<f64> = boss.iter().map(|&(x, y)| Coord { x, y }).collect();
    let polygon = Polygon::new(outline, vec![]);
    Line::new(Coord { x: a.0, y: a.1 }, Coord { x: b.0, y: b.1 }).intersects(&polygon)
}

/// Vertices of `boss` walked the shorter way round, from the one nearest
/// `from` to the one nearest `to`.
fn detour(boss: &[(f64, f64)], from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64)> {
    let (Some(a), Some(b)) = (closest_index(boss, from), closest_index(boss, to)) else {
        return Vec::new();
    };
    let n = boss.len();
    let forward: Vec<(f64, f64)> = (0..=(b + n - a) % n).map(|k| boss[(a + k) % n]).collect();
    let backward: Vec<(f64, f64)> = (0..=(a + n - b) % n).map(|k| boss[(a + n - k) % n]).collect();
    let length = |points: &[(f64, f64)]| {
        points
            .windows(2)
            .map(|w| distance(w[0], w[1]))
            .sum::<f64>()
    };
    if length(&forward) <= length(&backward) {
        forward
    } else {
        backward
    }
}

/// Appends `loop_` entered at its point closest to `from`, traversed once
/// around and closed. Returns the exit point.
fn splice_loop(loop_: &[(f64, f64)], from: (f64, f64), out: &mut Vec<(f64, f64)>) -> (f64, f64) {
    let Some(start) = closest_index(loop_, from) else {
        return from;
    };
    out.extend(loop_[start..].iter().chain(loop_[..start].iter()).copied());
    out.push(loop_[start]);
    loop_[start]
}

/// Paths for one depth.
#[derive(Debug, Clone, Serialize)]
pub struct PocketLayer {
    pub z: f64,
    pub paths: Vec<Path>,
}

/// Output of [`PocketPlanner::plan`].
#[derive(Debug, Clone, Serialize)]
pub struct PocketResult {
    #[serde(skip)]
    pub tree: IslandTree,
    pub layers: Vec<PocketLayer>,
    pub diagnostics: Diagnostics,
}

impl PocketResult {
    pub fn paths(&self) -> Vec<Path> {
        self.layers
            .iter()
            .flat_map(|layer| layer.paths.iter().cloned())
            .collect()
    }
}

/// Island-splitting pocket planner.
#[derive(Debug, Clone)]
pub struct PocketPlanner {
    params: PocketParams,
}

impl PocketPlanner {
    pub fn new(params: PocketParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PocketParams {
        &self.params
    }

    pub fn depths(&self) -> Vec<f64> {
        stepped_passes(
            self.params.top_z,
            self.params.target_z,
            self.params.tool.step_down,
        )
    }

    /// Builds the island tree once and replays its linked spirals at every
    /// depth.
    pub fn plan(&self, boundaries: &[BoundaryCurve]) -> CamToolResult<PocketResult> {
        if boundaries.is_empty() {
            return Err(CamToolError::MissingGeometry(
                "no pocket boundary curves".to_string(),
            ));
        }
        self.params.validate()?;

        let first_offset = self.params.tool.radius() + self.params.wall_allowance;
        let tree = IslandTree::build(
            boundaries,
            first_offset,
            self.params.tool.step_over,
            self.params.loop_limit,
        );

        let mut diagnostics = Diagnostics::new();
        if tree.limit_reached {
            diagnostics.push(PlanWarning::LoopLimitReached {
                context: "pocket island tree".to_string(),
                z: self.params.target_z,
                limit: self.params.loop_limit,
            });
        }

        let spirals = tree.link(self.params.flatten_tolerance);
        let layers: Vec<PocketLayer> = self
            .depths()
            .into_iter()
            .map(|z| PocketLayer {
                z,
                paths: spirals
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| Path::from_points(s.iter().map(|&(x, y)| Point3::new(x, y, z))))
                    .collect(),
            })
            .collect();

        info!(
            "Pocket: {} islands, {} loops, {} split events, {} depths",
            tree.islands.len(),
            tree.loop_count(),
            tree.split_events,
            layers.len()
        );

        Ok(PocketResult {
            tree,
            layers,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> BoundaryCurve {
        BoundaryCurve::from_points(&[(-half, -half), (half, -half), (half, half), (-half, half)])
    }

    #[test]
    fn test_square_spiral_counts() {
        let tree = IslandTree::build(&[square(20.0)], 1.0, 3.0, 500);
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.split_events, 0);
        // 19 -> 16, 13, 10, 7, 4, 1
        assert_eq!(tree.islands[0].rings.len(), 6);
        assert!(!tree.limit_reached);
    }

    #[test]
    fn test_step_over_wider_than_pocket_gives_no_rings() {
        let tree = IslandTree::build(&[square(2.0)], 1.0, 3.0, 500);
        assert_eq!(tree.roots.len(), 1);
        assert!(tree.islands[0].rings.is_empty());
        let tree = IslandTree::build(&[square(0.5)], 1.0, 3.0, 500);
        assert!(tree.roots.is_empty());
    }

    #[test]
    fn test_loop_limit_stops_tree() {
        let tree = IslandTree::build(&[square(50.0)], 1.0, 1.0, 5);
        assert!(tree.limit_reached);
        assert_eq!(tree.iterations, 5);
        assert_eq!(tree.islands[0].rings.len(), 5);
    }

    #[test]
    fn test_link_visits_every_loop_once() {
        let tree = IslandTree::build(&[square(10.0)], 1.0, 4.0, 500);
        let spirals = tree.link(0.01);
        assert_eq!(spirals.len(), 1);
        assert_eq!(tree.loop_count(), 3);
        // Four corners plus the closing point per loop.
        assert_eq!(spirals[0].len(), 5 * tree.loop_count());
    }

    #[test]
    fn test_boss_is_a_hole_of_the_enclosing_pocket() {
        let tree = IslandTree::build(&[square(20.0), square(5.0)], 1.0, 3.0, 500);
        assert_eq!(tree.roots.len(), 1);
        let root = &tree.islands[tree.roots[0]];
        assert_eq!(root.boundary.holes.len(), 1);
        assert!(tree.loop_count() > 1 + root.rings.len());
    }

    #[test]
    fn test_detour_takes_the_short_way_round() {
        let boss = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        assert!(blocks(&boss, (-3.0, 0.0), (3.0, 0.0)));
        assert!(!blocks(&boss, (-3.0, 2.0), (3.0, 2.0)));
        let path = detour(&boss, (-2.0, -2.0), (2.0, -2.0));
        assert_eq!(path, vec![(-1.0, -1.0), (1.0, -1.0)]);
        let path = detour(&boss, (-2.0, -2.0), (-2.0, 2.0));
        assert_eq!(path, vec![(-1.0, -1.0), (-1.0, 1.0)]);
    }

    #[test]
    fn test_plan_depths_and_validation() {
        let planner = PocketPlanner::new(PocketParams::new(
            ToolSettings::end_mill(2.0, 1.0, 2.0),
            0.0,
            -5.0,
        ));
        assert_eq!(planner.depths(), vec![-2.0, -4.0, -5.0]);
        let result = planner.plan(&[square(10.0)]).unwrap();
        assert_eq!(result.layers.len(), 3);
        assert!(result.layers.iter().all(|l| l.paths.len() == 1));
        assert!(planner.plan(&[]).is_err());
    }
}
