// tests/integration_tests.rs

use std::fs;
use std::path::Path;

#[test]
fn test_example_config_is_valid_toml() {
    let content = fs::read_to_string("opensky-tui.example.toml")
        .expect("Failed to read opensky-tui.example.toml");
    let value: toml::Value = toml::from_str(&content).expect("Example config is not valid TOML");

    let table = value.as_table().expect("Example config is not a table");
    for key in ["api_base", "timeout_secs", "min_lat", "max_lat", "min_lon", "max_lon"] {
        assert!(table.contains_key(key), "Example config missing {key}");
    }
    assert!(
        !table.contains_key("client_secret"),
        "Example config must not carry a client secret"
    );
    assert!(table["api_base"]
        .as_str()
        .is_some_and(|base| base.starts_with("https://")));
}

#[test]
fn test_project_structure() {
    let expected_files = vec![
        "src/main.rs",
        "src/app.rs",
        "src/ui.rs",
        "src/config.rs",
        "src/model.rs",
        "src/net.rs",
        "src/runtime.rs",
        "src/logging.rs",
        "src/export.rs",
        "Cargo.toml",
        "README.md",
    ];

    for file in expected_files {
        assert!(Path::new(file).exists(), "Expected file {} not found", file);
    }
}

#[test]
fn test_cargo_toml_metadata() {
    let cargo_content = fs::read_to_string("Cargo.toml").expect("Failed to read Cargo.toml");

    assert!(cargo_content.contains("name = \"opensky-tui\""), "Missing package name");
    assert!(cargo_content.contains("description ="), "Missing description");
    assert!(cargo_content.contains("license ="), "Missing license");
    assert!(cargo_content.contains("readme ="), "Missing readme");
    assert!(cargo_content.contains("repository ="), "Missing repository");
}

#[test]
fn test_readme_documents_usage() {
    let readme_content = fs::read_to_string("README.md").expect("Failed to read README.md");

    let required_sections = vec![
        "# OpenSky TUI",
        "## Quick Start",
        "## Configuration",
        "## Controls",
        "## Development",
    ];

    for section in required_sections {
        assert!(readme_content.contains(section), "README missing section: {}", section);
    }
    assert!(readme_content.contains("OPENSKY_CLIENT_SECRET"));
}
