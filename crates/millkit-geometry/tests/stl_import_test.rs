use millkit_geometry::{BooleanEngine, LayerSlicer, Mesh3D, MeshSurface, Model3DImporter, SurfaceQuery};
use nalgebra::{Point3, Vector3};

fn cuboid_stl(min: [f32; 3], max: [f32; 3]) -> Vec<u8> {
    let mesh = Mesh3D::cuboid(
        Point3::new(min[0] as f64, min[1] as f64, min[2] as f64),
        Point3::new(max[0] as f64, max[1] as f64, max[2] as f64),
    );
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|t| {
            let v = |i: usize| {
                stl_io::Vertex::new([
                    t.vertices[i].x as f32,
                    t.vertices[i].y as f32,
                    t.vertices[i].z as f32,
                ])
            };
            stl_io::Triangle {
                normal: stl_io::Normal::new([t.normal.x as f32, t.normal.y as f32, t.normal.z as f32]),
                vertices: [v(0), v(1), v(2)],
            }
        })
        .collect();
    let mut buffer = Vec::new();
    stl_io::write_stl(&mut buffer, triangles.iter()).unwrap();
    buffer
}

#[test]
fn test_import_binary_stl() {
    let data = cuboid_stl([0.0, 0.0, 0.0], [10.0, 20.0, 5.0]);
    let mesh = Model3DImporter::new().import_stl_data(&data).unwrap();
    assert_eq!(mesh.triangles.len(), 12);
    assert_eq!(mesh.bounds_min, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(mesh.bounds_max, Point3::new(10.0, 20.0, 5.0));
}

#[test]
fn test_import_with_scale_and_centering() {
    let data = cuboid_stl([0.0, 0.0, 0.0], [10.0, 20.0, 5.0]);
    let mesh = Model3DImporter::new()
        .with_scale(2.0)
        .with_centering(true)
        .import_stl_data(&data)
        .unwrap();
    assert_eq!(mesh.bounds_min, Point3::new(-10.0, -20.0, -5.0));
    assert_eq!(mesh.bounds_max, Point3::new(10.0, 20.0, 5.0));
}

#[test]
fn test_import_file_from_disk() {
    let dir = std::env::temp_dir().join(format!("millkit-stl-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("block.stl");
    std::fs::write(&path, cuboid_stl([-5.0, -5.0, 0.0], [5.0, 5.0, 2.0])).unwrap();

    let mesh = Model3DImporter::new().import_file(&path).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    let engine = BooleanEngine::default();
    let region = LayerSlicer::default().slice(&[&mesh], 1.0, &engine);
    assert!((millkit_geometry::region_area(&region) - 100.0).abs() < 1e-3);

    let surface = MeshSurface::new(&mesh).unwrap();
    let hit = surface
        .ray_intersect(&Point3::new(0.0, 0.0, 10.0), &-Vector3::z())
        .unwrap();
    assert!((hit.z - 2.0).abs() < 1e-6);
}

#[test]
fn test_garbage_data_is_parse_error() {
    let result = Model3DImporter::new().import_stl_data(b"not an stl");
    assert!(result.is_err());
}
