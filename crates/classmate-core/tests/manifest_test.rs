//! The library crates stay runtime-agnostic: tokio drives their tests only.

use std::path::Path;

fn manifest(crate_dir: &Path) -> toml::Table {
    let text = std::fs::read_to_string(crate_dir.join("Cargo.toml")).unwrap();
    text.parse().unwrap()
}

fn section<'a>(table: &'a toml::Table, name: &str) -> &'a toml::Table {
    table
        .get(name)
        .and_then(|v| v.as_table())
        .unwrap_or_else(|| panic!("missing [{name}]"))
}

#[test]
fn tokio_is_a_dev_dependency_of_core_and_db() {
    let core_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let db_dir = core_dir.join("../classmate-db");

    for dir in [core_dir.to_path_buf(), db_dir] {
        let table = manifest(&dir);
        assert!(
            !section(&table, "dependencies").contains_key("tokio"),
            "tokio is a runtime dependency in {}",
            dir.display()
        );
        assert!(section(&table, "dev-dependencies").contains_key("tokio"));
    }
}
