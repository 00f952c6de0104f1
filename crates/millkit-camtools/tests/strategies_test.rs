use millkit_camtools::{
    AssemblerParams, ProfileParams, ProfilePlanner, ProfileSide, RasterParams, RasterPlanner,
    Toolpath, ToolpathAssembler,
};
use millkit_core::{MotionType, ToolSettings};
use millkit_geometry::{BooleanEngine, BoundaryCurve, SafetyPlane};
use millkit_settings::JobConfig;

#[test]
fn test_profile_then_assemble_on_plane() {
    let config = JobConfig::default();
    let circle = BoundaryCurve::circle((0.0, 0.0), 30.0);
    let paths = ProfilePlanner::new(ProfileParams::from_config(&config, ProfileSide::Outside))
        .plan(&[circle])
        .unwrap();
    // Default pocket runs 0 to -5 with a 2 mm step-down.
    assert_eq!(paths.len(), 3);

    let mut toolpath = Toolpath::new(
        "profile",
        config.tool.clone(),
        SafetyPlane::horizontal(config.safety.rapid_height).into(),
        config.safety.rapid_height,
        config.safety.safe_height,
    )
    .with_paths(paths);
    let before = toolpath.summary();

    let diagnostics = ToolpathAssembler::new(AssemblerParams::from_config(&config))
        .assemble(&mut toolpath)
        .unwrap();
    assert!(diagnostics.is_empty());

    let after = toolpath.summary();
    assert_eq!(after.paths, 1);
    assert_eq!(after.waypoints, before.waypoints + 3 * 4);
    assert!(after.rapid_length > 0.0);

    let merged = &toolpath.paths[0];
    let plunges = merged.iter().filter(|w| w.motion() == MotionType::Plunge).count();
    assert_eq!(plunges, 3);
    assert!(merged
        .iter()
        .filter(|w| w.motion() == MotionType::Rapid)
        .all(|w| (w.position().z - config.safety.rapid_height).abs() < 1e-9));
}

#[test]
fn test_raster_over_region_from_loops() {
    let engine = BooleanEngine::default();
    let outer = BoundaryCurve::from_points(&[(0.0, 0.0), (40.0, 0.0), (40.0, 20.0), (0.0, 20.0)]);
    let island = BoundaryCurve::circle((20.0, 10.0), 4.0);
    let region = engine.region_from_loops(&[outer.to_line_string(0.01), island.to_line_string(0.01)]);

    let tool = ToolSettings::end_mill(2.0, 1.0, 1.0);
    let paths = RasterPlanner::new(RasterParams::new(tool, 0.0, -1.0))
        .plan(&region, None)
        .unwrap();
    assert!(!paths.is_empty());
    for p in paths.iter().flat_map(|path| path.positions()) {
        assert!((p.x - 20.0).hypot(p.y - 10.0) > 3.9);
    }
}
