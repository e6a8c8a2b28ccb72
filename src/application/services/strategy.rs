//! Strategy document service
//!
//! Loads a strategy document, applies cascading edits and writes it back.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{
    CascadeReport, DomainError, ParityViolation, StepTemplate, Strategy,
};
use crate::infrastructure::traits::FileSystem;

/// On-disk shape of a strategy: ordered root steps, each with attributes and children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDocument {
    #[serde(default)]
    pub steps: Vec<StepTemplate>,
}

impl StrategyDocument {
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        let document: Self =
            toml::from_str(content).map_err(|e| ApplicationError::StrategyDocument {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        for step in &document.steps {
            validate(step)?;
        }
        Ok(document)
    }

    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize strategy".to_string(),
            source: Box::new(e),
        })
    }
}

fn validate(template: &StepTemplate) -> Result<(), DomainError> {
    if template.name.trim().is_empty() {
        return Err(DomainError::InvalidStep("step without name".to_string()));
    }
    template.children.iter().try_for_each(validate)
}

/// Service for persisted strategies.
pub struct StrategyService {
    fs: Arc<dyn FileSystem>,
    warn_on_skip: bool,
}

impl StrategyService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            warn_on_skip: true,
        }
    }

    pub fn with_warn_on_skip(mut self, enabled: bool) -> Self {
        self.warn_on_skip = enabled;
        self
    }

    pub fn load(&self, path: &Path) -> ApplicationResult<Strategy> {
        debug!("load strategy: {}", path.display());
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read strategy", path)?;
        let document = StrategyDocument::parse(&content, path)?;
        Ok(Strategy::from_templates(&document.steps))
    }

    pub fn save(&self, path: &Path, strategy: &Strategy) -> ApplicationResult<()> {
        debug!("save strategy: {}", path.display());
        let document = StrategyDocument {
            steps: strategy.to_templates(),
        };
        self.fs
            .write(path, &document.to_toml()?)
            .with_path_context("write strategy", path)
    }

    /// Cascading insertion of `template` under every step named `parent`.
    pub fn insert(
        &self,
        path: &Path,
        parent: Option<&str>,
        template: &StepTemplate,
    ) -> ApplicationResult<CascadeReport> {
        validate(template)?;
        self.edit(path, "insert", parent, |strategy| {
            strategy.cascading_step_insertion(parent, template)
        })
    }

    pub fn delete(
        &self,
        path: &Path,
        parent: Option<&str>,
        name: &str,
        index: usize,
    ) -> ApplicationResult<CascadeReport> {
        self.edit(path, "delete", parent, |strategy| {
            strategy.cascading_step_deletion(parent, name, index)
        })
    }

    pub fn move_step(
        &self,
        path: &Path,
        parent: Option<&str>,
        name: &str,
        from: usize,
        to: usize,
    ) -> ApplicationResult<CascadeReport> {
        self.edit(path, "move", parent, |strategy| {
            strategy.cascading_step_move(parent, name, from, to)
        })
    }

    /// Structural parity check of a stored strategy.
    pub fn check(&self, path: &Path) -> ApplicationResult<Vec<ParityViolation>> {
        Ok(self.load(path)?.parity_violations())
    }

    fn edit<F>(
        &self,
        path: &Path,
        action: &str,
        parent: Option<&str>,
        apply: F,
    ) -> ApplicationResult<CascadeReport>
    where
        F: FnOnce(&mut Strategy) -> CascadeReport,
    {
        let mut strategy = self.load(path)?;
        if let Some(name) = parent {
            if strategy.find_by_name(name).is_empty() {
                return Err(ApplicationError::StepNotFound(name.to_string()));
            }
        }

        let report = apply(&mut strategy);
        if report.skipped > 0 && self.warn_on_skip {
            warn!(
                "{}: {} branch(es) under {:?} did not match and were left unchanged",
                action, report.skipped, parent
            );
        }
        if report.applied > 0 {
            self.save(path, &strategy)?;
        }
        debug!("{}: {}", action, report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_document_when_parsing_then_children_and_attributes_kept() {
        let content = r#"
[[steps]]
name = "Solve"
operation = "SOLVE"
[steps.attributes]
MaxIter = "10"
[[steps.children]]
name = "Predict"
"#;
        let document = StrategyDocument::parse(content, Path::new("s.toml")).unwrap();

        assert_eq!(document.steps.len(), 1);
        let solve = &document.steps[0];
        assert_eq!(solve.operation_name, "SOLVE");
        assert_eq!(solve.attributes.get("MaxIter"), Some("10"));
        assert_eq!(solve.children[0].name, "Predict");
    }

    #[test]
    fn given_unnamed_child_when_parsing_then_rejected() {
        let content = r#"
[[steps]]
name = "Solve"
[[steps.children]]
name = "  "
"#;
        let err = StrategyDocument::parse(content, Path::new("s.toml")).unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::InvalidStep(_))
        ));
    }

    #[test]
    fn given_broken_toml_when_parsing_then_document_error() {
        let err = StrategyDocument::parse("[[steps]\nname=", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ApplicationError::StrategyDocument { .. }));
    }
}
