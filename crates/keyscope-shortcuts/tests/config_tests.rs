use keyscope_shortcuts::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.yaml");
        fs::write(
            &path,
            "chord_timeout_ms: 750\nreport_unresolvable_scope: false\n",
        )
        .unwrap();

        let config = RouterConfig::load(&path).unwrap();
        assert_eq!(config.chord_timeout_ms, 750);
        assert!(!config.report_unresolvable_scope);
    }

    #[test]
    fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.json");
        fs::write(&path, r#"{"chord_timeout_ms": 400}"#).unwrap();

        let config = RouterConfig::load(&path).unwrap();
        assert_eq!(config.chord_timeout_ms, 400);
        assert!(config.report_unresolvable_scope);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.toml");
        fs::write(&path, "chord_timeout_ms = 400").unwrap();

        assert!(matches!(
            RouterConfig::load(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.yml");
        fs::write(&path, "chord_timeout_ms: [not, a, number]").unwrap();

        assert!(matches!(
            RouterConfig::load(&path),
            Err(ConfigError::InvalidYaml(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");

        assert!(matches!(RouterConfig::load(&path), Err(ConfigError::Io(_))));
        assert_eq!(
            RouterConfig::load_or_default(&path).unwrap(),
            RouterConfig::default()
        );
    }

    #[test]
    fn test_loaded_config_drives_map_and_router() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shortcuts.yaml");
        fs::write(&path, "chord_timeout_ms: 50\nreport_unresolvable_scope: false\n").unwrap();
        let config = RouterConfig::load(&path).unwrap();

        let map = ShortcutMap::with_config(&config);
        let router = KeyRouter::new(map, &config);
        assert_eq!(router.chord_timeout().as_millis(), 50);
    }
}
