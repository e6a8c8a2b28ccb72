//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::managers::RemoteRoot;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, StrategyCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{CascadeReport, StepTemplate};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    let settings = Settings::load(Some(project_dir.as_path()))?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Strategy { command } => cmd_strategy(&container, command),
        Commands::Browse {
            dump,
            tree_id,
            node_id,
            depth,
        } => cmd_browse(&container, dump.as_deref(), *tree_id, *node_id, *depth),
        Commands::Results { dir, depth } => cmd_results(&container, dir, *depth),
        Commands::Config { command } => cmd_config(&container, &project_dir, command),
        Commands::Completion { .. } => Ok(()),
    }
}

fn resolve_project_dir(dir: Option<&Path>) -> CliResult<PathBuf> {
    match dir {
        Some(d) => Ok(d.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("get current directory", e))),
    }
}

// ============================================================
// Strategy commands
// ============================================================

fn cmd_strategy(container: &ServiceContainer, command: &StrategyCommands) -> CliResult<()> {
    let service = &container.strategy_service;
    match command {
        StrategyCommands::Show { file, from, depth } => {
            let strategy = service.load(file)?.share();
            let title = file.display().to_string();
            let tree = container.browse_service.browse_strategy(
                strategy,
                &title,
                from.as_deref(),
                *depth,
            )?;
            output::info(&tree);
            Ok(())
        }
        StrategyCommands::Insert {
            file,
            parent,
            name,
            operation,
            attributes,
        } => {
            let template = build_template(name, operation.as_deref(), attributes)?;
            let report = service.insert(file, parent.as_deref(), &template)?;
            report_cascade("inserted", name, &report);
            Ok(())
        }
        StrategyCommands::Delete {
            file,
            parent,
            name,
            index,
        } => {
            let report = service.delete(file, parent.as_deref(), name, *index)?;
            report_cascade("deleted", name, &report);
            Ok(())
        }
        StrategyCommands::Move {
            file,
            parent,
            name,
            from,
            to,
        } => {
            let report = service.move_step(file, parent.as_deref(), name, *from, *to)?;
            report_cascade("moved", name, &report);
            Ok(())
        }
        StrategyCommands::Check { file } => {
            let violations = service.check(file)?;
            if violations.is_empty() {
                output::success("all parallel branches are identical");
                return Ok(());
            }
            output::header(&format!("{} drifted branch group(s):", violations.len()));
            for violation in &violations {
                output::failure(violation);
            }
            Err(CliError::from(ApplicationError::StrategyDocument {
                path: file.clone(),
                message: format!("{} parity violation(s)", violations.len()),
            }))
        }
    }
}

/// Build the inserted step from command line values.
fn build_template(
    name: &str,
    operation: Option<&str>,
    attributes: &[String],
) -> CliResult<StepTemplate> {
    let mut template = StepTemplate::new(name);
    if let Some(op) = operation {
        template = template.with_operation(op);
    }
    for attr in attributes {
        let (key, value) = parse_attribute(attr)?;
        template = template.with_attribute(key, value);
    }
    Ok(template)
}

fn parse_attribute(raw: &str) -> CliResult<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::InvalidArgs(format!(
            "attribute must be KEY=VALUE: {raw}"
        ))),
    }
}

fn report_cascade(action: &str, name: &str, report: &CascadeReport) {
    if report.is_noop() {
        output::warning(&format!("nothing {action}: no branch had '{name}' at the given position"));
    } else {
        output::action(action, report);
    }
}

// ============================================================
// Browse commands
// ============================================================

#[instrument(skip(container))]
fn cmd_browse(
    container: &ServiceContainer,
    dump: Option<&Path>,
    tree_id: i64,
    node_id: Option<i64>,
    depth: Option<usize>,
) -> CliResult<()> {
    let source = container.remote_source(dump)?;
    let tree = container
        .browse_service
        .browse_remote(source, RemoteRoot { tree_id, node_id }, depth)?;
    output::info(&tree);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_results(container: &ServiceContainer, dir: &Path, depth: Option<usize>) -> CliResult<()> {
    let tree = container.browse_service.browse_results(dir, depth)?;
    output::info(&tree);
    Ok(())
}

// ============================================================
// Config commands
// ============================================================

fn cmd_config(
    container: &ServiceContainer,
    project_dir: &Path,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
            Ok(())
        }
        ConfigCommands::Path => {
            debug!("config paths for {}", project_dir.display());
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            output::action("local", &local_config_path(project_dir).display());
            output::action("data", &container.settings.data_dir.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_key_value_when_parsing_attribute_then_split_at_first_equals() {
        assert_eq!(parse_attribute("Expr=a=b").unwrap(), ("Expr", "a=b"));
    }

    #[test]
    fn given_missing_equals_when_parsing_attribute_then_invalid_args() {
        assert!(matches!(
            parse_attribute("MaxIter"),
            Err(CliError::InvalidArgs(_))
        ));
        assert!(matches!(parse_attribute("=1"), Err(CliError::InvalidArgs(_))));
    }

    #[test]
    fn given_operation_and_attributes_when_building_template_then_all_set() {
        let attrs = vec!["MaxIter=10".to_string(), "Mode=fast".to_string()];
        let template = build_template("Solve", Some("SOLVE"), &attrs).unwrap();

        assert_eq!(template.name, "Solve");
        assert_eq!(template.operation_name, "SOLVE");
        assert_eq!(template.attributes.get("MaxIter"), Some("10"));
        assert_eq!(template.attributes.len(), 2);
    }
}
