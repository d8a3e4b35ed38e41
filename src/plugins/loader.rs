use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{PluginError, Result};

use super::dto::PluginDefinition;

pub const MANIFEST_NAMES: [&str; 3] = ["plugin.toml", "plugin.yaml", "plugin.yml"];
pub const README_FILE: &str = "README.md";
pub const EXAMPLE_CONFIG_FILE: &str = "config.example.yaml";
pub const TESTS_DIR: &str = "tests";
pub const EXAMPLES_DIR: &str = "examples";

impl PluginDefinition {
    /// Parses a manifest, choosing TOML or YAML from the extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PluginError::config_error(format!(
                "Failed to read plugin manifest {}: {}",
                path.display(),
                e
            ))
        })?;

        let definition: PluginDefinition = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                PluginError::config_error(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                PluginError::config_error(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            _ => {
                return Err(PluginError::config_error(format!(
                    "Unsupported manifest format: {}",
                    path.display()
                )))
            }
        };

        if definition.name.trim().is_empty() {
            return Err(PluginError::validation_error(format!(
                "Plugin manifest {} has an empty name",
                path.display()
            )));
        }
        Ok(definition)
    }
}

/// Finds the manifest file inside a plugin directory.
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

pub fn load_definition_dir(dir: &Path) -> Result<PluginDefinition> {
    let manifest = find_manifest(dir).ok_or_else(|| {
        PluginError::config_error(format!(
            "No plugin manifest ({}) in {}",
            MANIFEST_NAMES.join(", "),
            dir.display()
        ))
    })?;
    PluginDefinition::from_file(&manifest)
}

/// Reads `config.example.yaml` as a settings object.
pub fn load_example_settings(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| {
        PluginError::config_error(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    match value {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::Object(_) => Ok(value),
        _ => Err(PluginError::config_error(format!(
            "{} must contain a mapping",
            path.display()
        ))),
    }
}

/// Shallow merge: keys in `overlay` win.
pub fn merge_settings(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    if let Some(overlay) = overlay.as_object() {
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Which conventional entries a plugin directory has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginLayout {
    pub manifest: Option<PathBuf>,
    pub readme: bool,
    pub example_config: bool,
    pub tests_dir: bool,
    pub examples_dir: bool,
}

impl PluginLayout {
    pub fn inspect(dir: &Path) -> Self {
        Self {
            manifest: find_manifest(dir),
            readme: dir.join(README_FILE).is_file(),
            example_config: dir.join(EXAMPLE_CONFIG_FILE).is_file(),
            tests_dir: dir.join(TESTS_DIR).is_dir(),
            examples_dir: dir.join(EXAMPLES_DIR).is_dir(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginLoader {
    root_path: PathBuf,
}

impl PluginLoader {
    pub fn new(root_path: impl AsRef<Path>) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
        }
    }

    /// Loads every plugin directory directly under the root. Broken
    /// manifests are skipped with a warning.
    pub fn discover(&self) -> Result<Vec<PluginDefinition>> {
        tracing::info!("Scanning plugins in {}", self.root_path.display());
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.root_path)? {
            let path = entry?.path();
            if path.is_dir() && find_manifest(&path).is_some() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut definitions = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match load_definition_dir(&dir) {
                Ok(definition) => definitions.push(definition),
                Err(e) => tracing::warn!("Skipping plugin in {}: {}", dir.display(), e),
            }
        }
        tracing::info!("Discovered {} plugins", definitions.len());
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::dto::PluginKind;
    use serde_json::json;
    use std::fs;

    #[test]
    fn loads_toml_and_yaml_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("plugin.toml"), "name = \"a\"\nkind = \"echo\"\n").unwrap();
        fs::write(
            b.join("plugin.yaml"),
            "name: b\nkind: remote\nendpoint: http://localhost:9/invoke\n",
        )
        .unwrap();

        let defs = PluginLoader::new(dir.path()).discover().unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "a");
        assert_eq!(defs[0].kind, PluginKind::Echo);
        assert_eq!(defs[1].kind, PluginKind::Remote);
    }

    #[test]
    fn discover_skips_broken_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("plugin.toml"), "kind = 5").unwrap();
        fs::create_dir_all(dir.path().join("not-a-plugin")).unwrap();

        let defs = PluginLoader::new(dir.path()).discover().unwrap();
        assert!(defs.is_empty());
    }

    #[test]
    fn layout_inspection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "# x").unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();

        let layout = PluginLayout::inspect(dir.path());
        assert!(layout.readme);
        assert!(layout.tests_dir);
        assert!(!layout.example_config);
        assert!(!layout.examples_dir);
        assert!(layout.manifest.is_none());
    }

    #[test]
    fn merge_overrides_keys() {
        let merged = merge_settings(&json!({"a": 1, "b": 2}), &json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }
}
