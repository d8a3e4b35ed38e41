use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::builtin::build_plugin;
use super::dto::PluginDefinition;
use super::loader::{
    load_definition_dir, load_example_settings, merge_settings, PluginLayout, EXAMPLE_CONFIG_FILE,
    TESTS_DIR,
};
use super::manager::{ManagerOptions, PluginManager};
use super::schema::ToolSchema;
use super::store::EnablementStore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub outcome: CheckOutcome,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginTestReport {
    pub path: PathBuf,
    pub plugin: Option<String>,
    pub checks: Vec<CheckResult>,
}

impl PluginTestReport {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            plugin: None,
            checks: Vec::new(),
        }
    }

    fn record(&mut self, name: impl Into<String>, outcome: CheckOutcome, detail: impl Into<String>) {
        self.checks.push(CheckResult {
            name: name.into(),
            outcome,
            detail: detail.into(),
        });
    }

    pub fn passed(&self) -> bool {
        !self.checks.iter().any(|c| c.outcome == CheckOutcome::Fail)
    }

    pub fn count(&self, outcome: CheckOutcome) -> usize {
        self.checks.iter().filter(|c| c.outcome == outcome).count()
    }
}

impl fmt::Display for PluginTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Plugin test: {} ({})",
            self.plugin.as_deref().unwrap_or("<unknown>"),
            self.path.display()
        )?;
        for check in &self.checks {
            let tag = match check.outcome {
                CheckOutcome::Pass => "PASS",
                CheckOutcome::Warn => "WARN",
                CheckOutcome::Fail => "FAIL",
            };
            if check.detail.is_empty() {
                writeln!(f, "  [{}] {}", tag, check.name)?;
            } else {
                writeln!(f, "  [{}] {}: {}", tag, check.name, check.detail)?;
            }
        }
        write!(
            f,
            "{} passed, {} warnings, {} failed",
            self.count(CheckOutcome::Pass),
            self.count(CheckOutcome::Warn),
            self.count(CheckOutcome::Fail)
        )
    }
}

/// One call-and-check case, read from `tests/*.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeCase {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub expect_error: bool,
}

/// Runs the plugin checklist against a plugin directory.
pub async fn test_plugin_dir(dir: &Path) -> Result<PluginTestReport> {
    let mut report = PluginTestReport::new(dir);
    tracing::info!("Testing plugin directory {}", dir.display());

    let layout = PluginLayout::inspect(dir);
    check_layout(&mut report, &layout);

    let mut definition = match load_definition_dir(dir) {
        Ok(definition) => {
            report.record("manifest", CheckOutcome::Pass, "");
            definition
        }
        Err(e) => {
            report.record("manifest", CheckOutcome::Fail, e.to_string());
            return Ok(report);
        }
    };
    report.plugin = Some(definition.name.clone());

    if layout.example_config {
        match load_example_settings(&dir.join(EXAMPLE_CONFIG_FILE)) {
            Ok(settings) => {
                definition.settings = merge_settings(&definition.settings, &settings);
                report.record("example config", CheckOutcome::Pass, "");
            }
            Err(e) => report.record("example config", CheckOutcome::Fail, e.to_string()),
        }
    }

    check_declared_schemas(&mut report, &definition);

    let manager = PluginManager::new(EnablementStore::temporary()?, ManagerOptions::default());
    let mut config = definition.plugin_config();
    config.enabled = true;
    let tools = match manager.load(build_plugin(&definition), config).await {
        Ok(tools) => {
            report.record(
                "initialize",
                CheckOutcome::Pass,
                format!("{} tools", tools.len()),
            );
            tools
        }
        Err(e) => {
            report.record("initialize", CheckOutcome::Fail, e.to_string());
            return Ok(report);
        }
    };

    if tools.is_empty() {
        report.record("tools", CheckOutcome::Warn, "plugin offers no tools");
    }
    for tool in &tools {
        if tool.description.trim().is_empty() {
            report.record(
                format!("tool {}", tool.name),
                CheckOutcome::Warn,
                "missing description",
            );
        } else {
            report.record(format!("tool {}", tool.name), CheckOutcome::Pass, "");
        }
    }

    if layout.tests_dir {
        run_smoke_cases(&mut report, &manager, &dir.join(TESTS_DIR)).await?;
    }

    if let Err(e) = manager.shutdown_all().await {
        report.record("shutdown", CheckOutcome::Fail, e.to_string());
    }
    Ok(report)
}

fn check_layout(report: &mut PluginTestReport, layout: &PluginLayout) {
    let entries = [
        ("README.md", layout.readme),
        (EXAMPLE_CONFIG_FILE, layout.example_config),
        ("tests/", layout.tests_dir),
        ("examples/", layout.examples_dir),
    ];
    for (entry, present) in entries {
        if present {
            report.record(format!("layout {}", entry), CheckOutcome::Pass, "");
        } else {
            report.record(format!("layout {}", entry), CheckOutcome::Warn, "missing");
        }
    }
}

// Declared tools are checked before initialize so every bad schema is
// reported, not just the first one the manager trips over.
fn check_declared_schemas(report: &mut PluginTestReport, definition: &PluginDefinition) {
    for tool in &definition.tools {
        if let Err(e) = ToolSchema::compile(&tool.name, &tool.input_schema) {
            report.record(
                format!("schema {}", tool.name),
                CheckOutcome::Fail,
                e.to_string(),
            );
        }
    }
}

async fn run_smoke_cases(
    report: &mut PluginTestReport,
    manager: &PluginManager,
    tests_dir: &Path,
) -> Result<()> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(tests_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let label = format!(
            "smoke {}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
        );
        let case: SmokeCase = match std::fs::read_to_string(&path)
            .map_err(crate::error::PluginError::from)
            .and_then(|content| serde_json::from_str::<SmokeCase>(&content).map_err(Into::into))
        {
            Ok(case) => case,
            Err(e) => {
                report.record(label, CheckOutcome::Fail, e.to_string());
                continue;
            }
        };

        let (failed, detail) = match manager.call_tool(&case.tool, case.arguments).await {
            Ok(result) => (result.is_error, result.text_content()),
            Err(e) => (true, e.to_string()),
        };

        if failed == case.expect_error {
            report.record(label, CheckOutcome::Pass, "");
        } else if case.expect_error {
            report.record(label, CheckOutcome::Fail, "expected an error, call succeeded");
        } else {
            report.record(label, CheckOutcome::Fail, detail);
        }
    }
    Ok(())
}
