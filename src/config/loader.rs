// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::{validate_topology, EngineConfig};
use crate::errors::ConfigError;
use crate::workers::StubBehavior;

/// A runnable set of stub manifolds plus the engine settings to run them with.
///
/// Topologies drive the demo binary and make it easy to reproduce a
/// dependency shape without writing Rust.
///
/// # Example
/// ```yaml
/// engine:
///   error_delay_ms: 500
///   max_delay_ms: 8000
/// manifolds:
///   - name: agent
///   - name: api-caller
///     inputs: [agent]
///   - name: machiner
///     inputs: [api-caller]
///     behavior:
///       crash_after_ms: 1500
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub engine: EngineConfig,
    pub manifolds: Vec<ManifoldConfig>,
}

/// One manifold slot in a topology file.
///
/// # Fields
/// * `name` - Unique manifold name
/// * `inputs` - Names this manifold depends on (defaults to none)
/// * `behavior` - How the stub worker behaves (defaults to running until killed)
#[derive(Debug, Clone, Deserialize)]
pub struct ManifoldConfig {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub behavior: StubBehavior,
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = read(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load engine settings from a YAML or TOML file and validate them.
pub fn load_engine_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = parse(path.as_ref())?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Load a topology file and validate its manifold graph and engine settings.
pub fn load_topology<P: AsRef<Path>>(path: P) -> Result<Topology, ConfigError> {
    let topology: Topology = parse(path.as_ref())?;
    validate_topology(&topology).map_err(ConfigError::Invalid)?;
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_topology_yaml() {
        let yaml = r#"
engine:
  error_delay_ms: 100
manifolds:
  - name: agent
  - name: api-caller
    inputs: [agent]
    behavior:
      fail_start: 2
  - name: machiner
    inputs: [api-caller]
    behavior:
      crash_after_ms: 250
"#;
        let file = write_temp(".yaml", yaml);
        let topology = load_topology(file.path()).unwrap();

        assert_eq!(topology.engine.error_delay_ms, 100);
        assert_eq!(topology.manifolds.len(), 3);
        assert_eq!(topology.manifolds[1].inputs, vec!["agent"]);
        assert_eq!(topology.manifolds[0].behavior, StubBehavior::default());
        assert_eq!(topology.manifolds[1].behavior.fail_start, 2);
        assert_eq!(topology.manifolds[2].behavior.crash_after_ms, Some(250));
    }

    #[test]
    fn test_load_engine_config_toml() {
        let file = write_temp(
            ".toml",
            "error_delay_ms = 50\nbackoff_factor = 1.5\nmax_concurrent_starts = 3\n",
        );
        let config = load_engine_config(file.path()).unwrap();
        assert_eq!(config.error_delay_ms, 50);
        assert_eq!(config.backoff_factor, 1.5);
        assert_eq!(config.max_concurrent_starts, Some(3));
    }

    #[test]
    fn test_load_rejects_cyclic_topology() {
        let yaml = r#"
manifolds:
  - name: a
    inputs: [b]
  - name: b
    inputs: [a]
"#;
        let file = write_temp(".yml", yaml);
        match load_topology(file.path()) {
            Err(ConfigError::Invalid(errors)) => {
                assert!(matches!(errors[0], ValidationError::CyclicDependency { .. }));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = write_temp(".json", "{}");
        assert!(matches!(
            load_engine_config(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_topology("does/not/exist.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
