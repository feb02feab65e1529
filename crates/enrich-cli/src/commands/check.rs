//! `enrich check` command implementation.
//!
//! Validates the configuration and model before serving:
//! - every entity, field and relationship is described
//! - relationship targets exist and every relationship has a join
//! - join columns name declared fields
//! - fixture data only names declared entities

use anyhow::Result;
use enrich_core::{EnrichConfig, ModelFile};
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: &'static str,
    pub message: String,
    /// Location within the model, e.g. `User.orders`.
    pub location: Option<String>,
}

impl CheckFinding {
    fn error(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
        }
    }

    fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            location: None,
        }
    }

    fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        for (severity, header) in [(Severity::Error, "❌ Errors"), (Severity::Warning, "⚠️  Warnings")] {
            let mut group: Vec<_> = self
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by_key(|f| f.category);

            println!("\n{} ({}):", header, group.len());
            println!("{}", "─".repeat(60));
            for finding in group {
                match &finding.location {
                    Some(location) => println!(
                        "  [{}] {} ({})",
                        finding.category, finding.message, location
                    ),
                    None => println!("  [{}] {}", finding.category, finding.message),
                }
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if self.findings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Found {} error(s), {} warning(s)",
                self.count(Severity::Error),
                self.count(Severity::Warning)
            );
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

fn check_entities(model: &ModelFile) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    let mut seen = HashSet::new();

    for spec in &model.entities {
        if !seen.insert(spec.name.as_str()) {
            findings.push(
                CheckFinding::error("model", format!("entity '{}' is declared twice", spec.name))
                    .at(&spec.name),
            );
        }
        match spec.to_def() {
            Ok(def) => {
                if let Err(e) = def.validate() {
                    findings.push(CheckFinding::error("model", e.to_string()).at(&spec.name));
                }
                if def.get_field("id").is_none() {
                    findings.push(
                        CheckFinding::warning(
                            "model",
                            "no 'id' field; get and update tools will take an integer id",
                        )
                        .at(&spec.name),
                    );
                }
            }
            Err(e) => findings.push(CheckFinding::error("model", e.to_string()).at(&spec.name)),
        }
    }

    findings
}

fn check_relationships(model: &ModelFile) -> Vec<CheckFinding> {
    let mut findings = Vec::new();

    for spec in &model.entities {
        for rel in &spec.relationships {
            let location = format!("{}.{}", spec.name, rel.name);

            let Some(target) = model.get_entity(&rel.target) else {
                findings.push(
                    CheckFinding::error(
                        "relationships",
                        format!("target entity '{}' is not declared", rel.target),
                    )
                    .at(location),
                );
                continue;
            };

            let Some(join) = &rel.join else {
                findings.push(
                    CheckFinding::error(
                        "relationships",
                        "no join declared, so no resolver can be bound",
                    )
                    .at(location),
                );
                continue;
            };

            if join.local != "id" && !spec.fields.iter().any(|f| f.name == join.local) {
                findings.push(
                    CheckFinding::warning(
                        "relationships",
                        format!("join column '{}' is not a field of {}", join.local, spec.name),
                    )
                    .at(location.clone()),
                );
            }
            if !target.fields.iter().any(|f| f.name == join.remote) {
                findings.push(
                    CheckFinding::warning(
                        "relationships",
                        format!("join column '{}' is not a field of {}", join.remote, target.name),
                    )
                    .at(location),
                );
            }
        }
    }

    findings
}

fn check_data(config: &EnrichConfig, model: &ModelFile) -> Vec<CheckFinding> {
    let data = match config.load_data() {
        Ok(Some(data)) => data,
        Ok(None) => return Vec::new(),
        Err(e) => return vec![CheckFinding::error("data", e.to_string())],
    };

    let Some(tables) = data.as_object() else {
        return vec![CheckFinding::error(
            "data",
            "data file must be an object keyed by entity name",
        )];
    };

    tables
        .keys()
        .filter(|name| model.get_entity(name).is_none())
        .map(|name| {
            CheckFinding::warning("data", format!("rows for undeclared entity '{}' are ignored", name))
                .at(name.as_str())
        })
        .collect()
}

/// Run every check against an already loaded configuration.
pub fn run_checks(config: &EnrichConfig) -> CheckResults {
    let mut results = CheckResults::default();

    if !config.mcp.enabled {
        results
            .findings
            .push(CheckFinding::warning("mcp", "MCP server is disabled; `enrich serve` will refuse to start"));
    }

    let model = match config.load_model() {
        Ok(model) => model,
        Err(e) => {
            results.findings.push(CheckFinding::error("model", e.to_string()));
            return results;
        }
    };

    results.findings.extend(check_entities(&model));
    results.findings.extend(check_relationships(&model));
    results.findings.extend(check_data(config, &model));

    // Anything the static checks missed surfaces when the app is assembled.
    if !results.has_errors() {
        let finalized = super::build_app(config)
            .and_then(|mut app| app.finalize().map_err(anyhow::Error::from));
        if let Err(e) = finalized {
            results.findings.push(CheckFinding::error("startup", format!("{:#}", e)));
        }
    }

    results
}

pub fn run(config_path: PathBuf) -> Result<()> {
    println!("🔍 Checking Enrich configuration...");

    let config = super::load_config(&config_path)?;
    println!("   Title: {}", config.title);
    println!("   Transport: {}", config.mcp.transport);

    let results = run_checks(&config);
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!("Configuration has errors that must be fixed");
    }
    Ok(())
}
