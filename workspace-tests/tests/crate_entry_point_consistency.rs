use proptest::prelude::*;
use std::fs;
use std::path::Path;

/// Library crates must ship `src/lib.rs` and binary crates the file their
/// `[[bin]]` entry points at (or `src/main.rs` when inferred).
#[cfg(test)]
mod crate_entry_point_tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct CrateInfo {
        has_lib_rs: bool,
        bin_paths: Vec<String>,
    }

    fn parse_crate_info(crate_name: &str) -> Result<CrateInfo, String> {
        let manifest_path = format!("../{}/Cargo.toml", crate_name);
        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| format!("Failed to read {}: {}", manifest_path, e))?;
        let manifest: toml::Table = content
            .parse()
            .map_err(|e| format!("Failed to parse {}: {}", manifest_path, e))?;

        let mut bin_paths: Vec<String> = manifest
            .get("bin")
            .and_then(|b| b.as_array())
            .map(|bins| {
                bins.iter()
                    .map(|bin| {
                        bin.get("path")
                            .and_then(|p| p.as_str())
                            .unwrap_or("src/main.rs")
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let main_rs = format!("../{}/src/main.rs", crate_name);
        if bin_paths.is_empty() && Path::new(&main_rs).exists() {
            bin_paths.push("src/main.rs".to_string());
        }

        Ok(CrateInfo {
            has_lib_rs: Path::new(&format!("../{}/src/lib.rs", crate_name)).exists(),
            bin_paths,
        })
    }

    proptest! {
        #[test]
        fn test_crate_entry_point_consistency(
            crate_name in prop::sample::select(vec!["langproxy-core", "langproxy-agent", "langpack-tools"])
        ) {
            let info = parse_crate_info(crate_name).map_err(TestCaseError::fail)?;

            for bin in &info.bin_paths {
                let path = format!("../{}/{}", crate_name, bin);
                prop_assert!(
                    Path::new(&path).exists(),
                    "Crate '{}' declares binary {} which does not exist",
                    crate_name,
                    bin
                );
            }

            prop_assert!(
                info.has_lib_rs || !info.bin_paths.is_empty(),
                "Crate '{}' has no entry point",
                crate_name
            );
        }
    }

    #[test]
    fn test_specific_crate_entry_points() {
        let core = parse_crate_info("langproxy-core").unwrap();
        assert!(core.has_lib_rs, "langproxy-core should be a library");
        assert!(core.bin_paths.is_empty(), "langproxy-core has no binary");

        // Binaries are thin wrappers over a testable library
        for name in ["langproxy-agent", "langpack-tools"] {
            let info = parse_crate_info(name).unwrap();
            assert!(info.has_lib_rs, "{} should have lib.rs", name);
            assert_eq!(info.bin_paths, vec!["src/main.rs".to_string()]);
        }
    }
}
