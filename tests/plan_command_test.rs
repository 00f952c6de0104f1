use clap::Parser;
use millkit::cli::Cli;
use millkit::JobConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_plan_pocket_writes_program() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("job.toml");
    let boundary_path = dir.path().join("pocket.json");
    let output_path = dir.path().join("program.json");

    let mut config = JobConfig::default();
    config.pocket.target_z = -2.0;
    config.save_to_file(&config_path).unwrap();
    fs::write(
        &boundary_path,
        r#"{"curves": [[[0, 0], [30, 0], [30, 20], [0, 20]]]}"#,
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "millkit",
        "plan",
        "--strategy",
        "pocket",
        "--config",
        config_path.to_str().unwrap(),
        "--boundary",
        boundary_path.to_str().unwrap(),
        "--output",
        output_path.to_str().unwrap(),
    ])
    .unwrap();
    cli.run().unwrap();

    let program: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(program["strategy"], "pocket");
    assert_eq!(program["paths"].as_array().unwrap().len(), 1);
    let first = &program["paths"][0][0];
    assert_eq!(first["type"], 1);
    assert_eq!(first["position"][2], 25.0);
    assert!(program["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "millkit",
        "plan",
        "--config",
        dir.path().join("absent.toml").to_str().unwrap(),
    ])
    .unwrap();
    let err = cli.run().unwrap_err();
    assert!(format!("{:#}", err).contains("absent.toml"));
}
