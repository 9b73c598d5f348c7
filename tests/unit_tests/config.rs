use nlfem::config::{self, Config1d, Config2d};
use std::io::Write;

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn two_dimensional_config_requires_the_mesh_path() {
    let path = write_temp("nlfem_config_2d.json", r#"{"mesh": "meshes/plate.su2"}"#);
    let config: Config2d = config::load_2d(&path).unwrap();
    assert_eq!(config.mesh, std::path::PathBuf::from("meshes/plate.su2"));
    std::fs::remove_file(path).ok();

    let missing = write_temp("nlfem_config_2d_missing.json", r#"{}"#);
    assert!(matches!(
        config::load_2d(&missing),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
    std::fs::remove_file(missing).ok();
}

#[test]
fn one_dimensional_config_defaults() {
    let path = write_temp("nlfem_config_1d_empty.json", r#"{}"#);
    let config: Config1d = config::load_1d(&path).unwrap();
    assert_eq!(config.element_order, 1);
    assert_eq!(config.quadrature_order(), 1);
    std::fs::remove_file(path).ok();

    let path = write_temp(
        "nlfem_config_1d_full.json",
        r#"{"element_order": 2, "quadrature_order": 3}"#,
    );
    let config: Config1d = config::load_1d(&path).unwrap();
    assert_eq!(config.element_order, 2);
    assert_eq!(config.quadrature_order(), 3);
    std::fs::remove_file(path).ok();
}

#[test]
fn model_parameters_are_range_checked() {
    assert!(config::validate_model(0.1, 0.5).is_ok());
    assert!(config::validate_model(0.0, 1.0).is_ok());
    assert!(matches!(
        config::validate_model(0.1, 1.5),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
    assert!(matches!(
        config::validate_model(0.1, -0.1),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
    assert!(matches!(
        config::validate_model(-0.5, 0.5),
        Err(nlfem::Error::ConfigInvalid(_))
    ));

    let missing = std::env::temp_dir().join("nlfem_config_nonexistent.json");
    assert!(matches!(
        config::load_2d(&missing),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
}
