use crate::agents::{DockerUpdater, UpdateInteraction};
use crate::config::UpdaterConfig;
use crate::error::{DockupError, Result};
use crate::repository::{Dependency, Update};
use crate::version;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Updates found by a check run, plus the dependencies that could not be checked.
#[derive(Debug, Default)]
struct CheckReport {
    updates: Vec<Update>,
    failures: Vec<(Dependency, DockupError)>,
    checked: usize,
}

/// Execute the list workflow
pub fn execute_list(config: &UpdaterConfig) -> Result<()> {
    println!("{}", "Scanning Dockerfiles...".cyan().bold());
    let updater = DockerUpdater::new(config)?;
    let dependencies = updater.dependencies()?;

    if dependencies.is_empty() {
        println!("\n{}", "No dependencies found".yellow());
        return Ok(());
    }

    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for dependency in &dependencies {
        let versions = grouped.entry(dependency.path.as_str()).or_default();
        if !versions.contains(&dependency.version.as_str()) {
            versions.push(dependency.version.as_str());
        }
    }

    println!(
        "\n{}",
        format!("Found {} {} dependencies:", dependencies.len(), updater.name()).cyan().bold()
    );
    for (path, versions) in grouped {
        println!("  • {} {}", path.white().bold(), versions.join(", ").dimmed());
    }
    Ok(())
}

/// Execute the check workflow (dry-run)
pub fn execute_check(config: &UpdaterConfig, same_major: bool) -> Result<()> {
    println!("{}", "Checking for available updates...".cyan().bold());

    println!("\n{}", "1. Scanning Dockerfiles...".yellow());
    let updater = DockerUpdater::new(config)?;
    let dependencies = updater.dependencies()?;
    println!("   Found {} dependencies in {}", dependencies.len(), updater.root().display());

    println!("\n{}", "2. Querying registries...".yellow());
    let report = check_all(&updater, &dependencies, same_major, true);
    println!("{}", "✓ Check completed".green());

    print_failures(&report);
    print_available_updates(&report);
    Ok(())
}

/// Execute the update workflow
pub fn execute_update(config: &UpdaterConfig, interactive: bool, same_major: bool) -> Result<()> {
    println!("{}", "Starting dependency update process...".cyan().bold());

    println!("\n{}", "1. Scanning Dockerfiles...".yellow());
    let updater = DockerUpdater::new(config)?;
    let dependencies = updater.dependencies()?;
    println!("   Found {} dependencies in {}", dependencies.len(), updater.root().display());

    println!("\n{}", "2. Querying registries...".yellow());
    let report = check_all(&updater, &dependencies, same_major, !interactive);
    print_failures(&report);

    println!("\n{}", "3. Applying updates...".yellow());
    let mut interaction = UpdateInteraction::new(interactive);
    let outcome = apply_all(&updater, report.updates, |update| interaction.confirm(update))?;
    if outcome.cancelled {
        println!("\n{}", "Update cancelled by user.".yellow());
    }

    print_update_summary(&outcome, updater.root());
    Ok(())
}

/// Updates written to disk, and the ones that failed to apply.
#[derive(Debug, Default)]
struct ApplyOutcome {
    applied: Vec<(Update, Vec<PathBuf>)>,
    failed: Vec<(Update, DockupError)>,
    cancelled: bool,
}

/// Applies each confirmed update in turn. A failed update is recorded and the
/// rest still run; cancelling stops before the next one.
fn apply_all<F>(updater: &DockerUpdater, updates: Vec<Update>, mut confirm: F) -> Result<ApplyOutcome>
where
    F: FnMut(&Update) -> Result<bool>,
{
    let mut outcome = ApplyOutcome::default();
    for update in updates {
        match confirm(&update) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(DockupError::UserCancelled) => {
                outcome.cancelled = true;
                break;
            }
            Err(err) => return Err(err),
        }

        match updater.apply_update(&update) {
            Ok(files) if files.is_empty() => {}
            Ok(files) => outcome.applied.push((update, files)),
            Err(err) => {
                tracing::warn!(dependency = %update.path, next = %update.next, error = %err, "update failed");
                outcome.failed.push((update, err));
            }
        }
    }
    Ok(outcome)
}

fn check_all(
    updater: &DockerUpdater,
    dependencies: &[Dependency],
    same_major: bool,
    show_progress: bool,
) -> CheckReport {
    let mut seen = HashSet::new();
    let unique: Vec<&Dependency> = dependencies.iter().filter(|dep| seen.insert(*dep)).collect();

    let pb = if show_progress {
        ProgressBar::new(unique.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut report = CheckReport::default();
    for dependency in unique {
        pb.set_message(dependency.path.clone());

        let major = same_major
            .then(|| version::normalize(&dependency.version))
            .flatten()
            .and_then(|current| version::major(&current));
        let same_major_only = |candidate: &str| version::major(candidate) == major;
        let accept: Option<&dyn Fn(&str) -> bool> = match major {
            Some(_) => Some(&same_major_only),
            None => None,
        };

        match updater.check(dependency, accept) {
            Ok(Some(update)) => report.updates.push(update),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(dependency = %dependency, error = %err, "check failed");
                report.failures.push((dependency.clone(), err));
            }
        }
        report.checked += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();
    report
}

fn print_failures(report: &CheckReport) {
    if report.failures.is_empty() {
        return;
    }
    println!(
        "\n{}",
        format!("⚠ {} dependencies could not be checked:", report.failures.len()).red()
    );
    for (dependency, err) in &report.failures {
        println!("  • {} {}", dependency.to_string().white().bold(), err.to_string().dimmed());
    }
}

fn print_available_updates(report: &CheckReport) {
    if report.updates.is_empty() {
        println!(
            "\n{}",
            format!("✨ All {} dependencies are up to date!", report.checked).green().bold()
        );
        return;
    }

    println!("\n{}", "📦 Available Updates:".cyan().bold());
    println!("{}", format!("Found {} update(s)", report.updates.len()).yellow());
    for update in &report.updates {
        println!(
            "  • {} {} → {}",
            update.path.white().bold(),
            update.previous.red(),
            update.next.green().bold()
        );
    }

    println!("\n{}", "To apply these updates, run:".dimmed());
    println!("  {}", "dockup update".cyan());
}

fn print_update_summary(outcome: &ApplyOutcome, root: &std::path::Path) {
    if !outcome.failed.is_empty() {
        println!(
            "\n{}",
            format!("⚠ {} update(s) could not be applied:", outcome.failed.len()).red()
        );
        for (update, err) in &outcome.failed {
            println!(
                "  • {} {} → {} {}",
                update.path.white().bold(),
                update.previous,
                update.next,
                err.to_string().dimmed()
            );
        }
    }

    if outcome.applied.is_empty() {
        println!("\n{}", "No updates were applied".yellow());
        return;
    }

    println!("\n{}", "📦 Applied Updates:".cyan().bold());
    for (update, files) in &outcome.applied {
        println!(
            "  • {} {} → {}",
            update.path.white().bold(),
            update.previous.red(),
            update.next.green().bold()
        );
        for file in files {
            let shown = file.strip_prefix(root).unwrap_or(file);
            println!("      {}", shown.display().to_string().dimmed());
        }
    }

    if outcome.failed.is_empty() {
        println!("\n{}", "✨ Update process completed successfully!".green().bold());
    } else {
        println!("\n{}", "Update process completed with failures.".yellow().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::update_checker::tests::FakeRegistry;
    use crate::config::Mode;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    const NEXT_DIGEST: &str =
        "sha256:fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

    fn updater(root: &std::path::Path, registry: FakeRegistry) -> DockerUpdater {
        pinning_updater(root, registry, false)
    }

    fn pinning_updater(root: &std::path::Path, registry: FakeRegistry, sha_pinning: bool) -> DockerUpdater {
        let config = UpdaterConfig::new(root, Vec::new(), sha_pinning, Mode::Images).unwrap();
        let registry = Arc::new(registry);
        DockerUpdater::with_clients(&config, registry.clone(), registry).unwrap()
    }

    #[test]
    fn failures_do_not_stop_other_checks() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Dockerfile"),
            "FROM missing:1.0.0\nFROM node:18.0.0\nFROM node:18.0.0\n",
        )
        .unwrap();

        let updater = updater(dir.path(), FakeRegistry::with_tags("node", &["18.19.0", "20.10.0"]));
        let dependencies = updater.dependencies().unwrap();
        let report = check_all(&updater, &dependencies, false, false);

        assert_eq!(report.checked, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0.path, "missing");
        assert_eq!(report.updates.len(), 1);
        assert_eq!(report.updates[0].next, "20.10.0");
    }

    #[test]
    fn same_major_limits_candidates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node:18.0.0\n").unwrap();

        let updater = updater(dir.path(), FakeRegistry::with_tags("node", &["18.19.0", "20.10.0"]));
        let dependencies = updater.dependencies().unwrap();
        let report = check_all(&updater, &dependencies, true, false);

        assert_eq!(report.updates[0].next, "18.19.0");
    }

    fn update(path: &str, previous: &str, next: &str) -> Update {
        Update {
            path: path.to_string(),
            previous: previous.to_string(),
            next: next.to_string(),
        }
    }

    #[test]
    fn failed_updates_do_not_stop_the_rest() {
        let dir = tempdir().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine:3.18.0\nFROM node:18.0.0\n").unwrap();

        let registry = FakeRegistry::default().with_digest("alpine:3.19.0", NEXT_DIGEST);
        let updater = pinning_updater(dir.path(), registry, true);
        let updates = vec![update("node", "18.0.0", "20.10.0"), update("alpine", "3.18.0", "3.19.0")];

        let outcome = apply_all(&updater, updates, |_| Ok(true)).unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0.path, "node");
        assert!(matches!(outcome.failed[0].1, DockupError::UnresolvablePlatform(_)));
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].0.path, "alpine");
        assert!(!outcome.cancelled);
        assert_eq!(
            fs::read_to_string(&dockerfile).unwrap(),
            format!("# alpine:3.19.0\nFROM alpine@{NEXT_DIGEST}\nFROM node:18.0.0\n")
        );
    }

    #[test]
    fn cancelling_stops_before_the_next_update() {
        let dir = tempdir().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine:3.18.0\nFROM node:18.0.0\n").unwrap();

        let updater = updater(dir.path(), FakeRegistry::default());
        let updates = vec![update("alpine", "3.18.0", "3.19.0"), update("node", "18.0.0", "20.10.0")];
        let mut asked = 0;
        let outcome = apply_all(&updater, updates, |_| {
            asked += 1;
            match asked {
                1 => Ok(true),
                _ => Err(DockupError::UserCancelled),
            }
        })
        .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(
            fs::read_to_string(&dockerfile).unwrap(),
            "FROM alpine:3.19.0\nFROM node:18.0.0\n"
        );
    }
}
