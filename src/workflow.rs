use crate::agents::{
    ImpactAnalyzer, ImpactReport, PackageOutcome, PlanContext, PlanOptions, PlanReport,
    ProjectScannerAgent, Resolution, UpdatePlanner,
};
use crate::composer::{
    ComposerLockFile, LockSnapshot, LockState, OutdatedReport, OutdatedScanner, apply_ignore_list,
};
use crate::config::Config;
use crate::constraint::ConstraintEvaluator;
use crate::error::Result;
use crate::registry::RegistryFactory;
use colored::Colorize;
use std::path::Path;

/// Execute the plan workflow
pub fn execute_plan<P: AsRef<Path>>(
    project_path: P,
    report: Option<&str>,
    no_dev: bool,
    with_transitive: bool,
    json: bool,
) -> Result<()> {
    let project_path = project_path.as_ref();
    let steps = Steps::new(!json);
    steps.title("Planning dependency upgrades...");

    // Step 1: Validate project structure
    steps.step("1. Validating project structure...");
    let project_info = ProjectScannerAgent::new(project_path).validate()?;
    steps.done("Project structure is valid");
    if !project_info.has_lock {
        steps.warn("composer.lock not found, dependents cannot be checked");
    }

    // Step 2: Load configuration
    steps.step("2. Loading configuration...");
    let config = Config::load(project_path)?;
    let ignore = config.ignore_list()?;
    let registry = RegistryFactory::create(&config)?;
    match &project_info.config_path {
        Some(path) => steps.detail(&format!("Using {}", path.display())),
        None => steps.detail("Using defaults"),
    }
    steps.detail(&format!("Registry: {}", config.registry));

    // Step 3: Take the lock snapshot once for the whole run
    steps.step("3. Reading installed packages...");
    let snapshot = ComposerLockFile::new(project_path).snapshot();
    steps.done(&format!("{} packages installed", snapshot.packages.len()));

    // Step 4: Collect candidates
    steps.step("4. Collecting outdated packages...");
    let outdated = match report {
        Some(report_path) => OutdatedReport::from_file(report_path, &snapshot)?,
        None => OutdatedScanner::new(registry.clone())
            .with_progress(!json)
            .scan(&snapshot, config.include_dev && !no_dev),
    };
    let outdated = apply_ignore_list(outdated, &ignore);
    steps.done(&format!("{} outdated packages", outdated.len()));

    // Step 5: Resolve and order
    steps.step("5. Resolving safe versions...");
    let context = PlanContext::new(registry, snapshot).with_options(PlanOptions {
        impact_depth: config.impact_depth,
        merge_transitive: with_transitive,
        show_progress: !json,
    });
    let plan = UpdatePlanner::new(&context).plan(&outdated);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan, with_transitive);
    }

    Ok(())
}

/// Execute the impact workflow
pub fn execute_impact<P: AsRef<Path>>(
    project_path: P,
    package: &str,
    version: &str,
    depth: Option<usize>,
    json: bool,
) -> Result<()> {
    let project_path = project_path.as_ref();
    let steps = Steps::new(!json);
    steps.title(&format!("Analyzing impact of {} {}...", package, version));

    steps.step("1. Validating project structure...");
    ProjectScannerAgent::new(project_path).validate()?;
    steps.done("Project structure is valid");

    steps.step("2. Reading installed packages...");
    let config = Config::load(project_path)?;
    let snapshot = ComposerLockFile::new(project_path).snapshot();
    if snapshot.is_empty() {
        steps.warn("No installed packages found, nothing can be impacted");
    } else {
        steps.done(&format!("{} packages installed", snapshot.packages.len()));
    }

    let report = analyze_impact(&snapshot, package, version, depth.unwrap_or(config.impact_depth));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_impact(package, version, &report);
    }

    Ok(())
}

fn analyze_impact(snapshot: &LockSnapshot, package: &str, version: &str, depth: usize) -> ImpactReport {
    ImpactAnalyzer::new(snapshot)
        .with_max_depth(depth)
        .analyze(package, version)
}

/// Execute the satisfies workflow; returns whether the version matched
pub fn execute_satisfies(version: &str, constraint: &str) -> bool {
    let satisfied = ConstraintEvaluator::satisfies(version, constraint);
    if satisfied {
        println!(
            "{} {} satisfies {}",
            "✓".green(),
            version.white().bold(),
            constraint.cyan()
        );
    } else {
        println!(
            "{} {} does not satisfy {}",
            "✗".red(),
            version.white().bold(),
            constraint.cyan()
        );
    }
    satisfied
}

/// Colored step output, silenced when JSON goes to stdout
struct Steps {
    enabled: bool,
}

impl Steps {
    fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn title(&self, message: &str) {
        if self.enabled {
            println!("{}", message.cyan().bold());
        }
    }

    fn step(&self, message: &str) {
        if self.enabled {
            println!("\n{}", message.yellow());
        }
    }

    fn done(&self, message: &str) {
        if self.enabled {
            println!("{}", format!("✓ {}", message).green());
        }
    }

    fn detail(&self, message: &str) {
        if self.enabled {
            println!("   {}", message.dimmed());
        }
    }

    fn warn(&self, message: &str) {
        if self.enabled {
            println!("{}", format!("⚠ {}", message).red());
        }
    }
}

fn print_plan(plan: &PlanReport, with_transitive: bool) {
    if plan.is_empty() {
        println!("\n{}", "✓ All dependencies are up to date!".green().bold());
        return;
    }

    println!("\n{}", "Resolution:".cyan().bold());
    for outcome in &plan.packages {
        print_outcome(outcome);
    }

    if !plan.transitive_updates.is_empty() {
        println!("\n{}", "Transitive updates required:".cyan().bold());
        for update in &plan.transitive_updates {
            let requesters: Vec<String> = update
                .requested_by
                .iter()
                .map(|r| format!("{} {}", r.package, r.version))
                .collect();
            println!(
                "  • {} {} → {} {}",
                update.package.white().bold(),
                update.installed_version.red(),
                update.suggested_version.green(),
                format!("({} needed by {})", update.constraint, requesters.join(", ")).dimmed()
            );
        }
        if !with_transitive {
            println!(
                "  {}",
                "Run with --with-transitive to schedule these updates".dimmed()
            );
        }
    }

    let blocked = plan.blocked().count();
    if blocked > 0 {
        println!(
            "\n{}",
            format!("⚠ {} packages cannot be upgraded safely", blocked).red()
        );
    }

    if plan.batches.is_empty() {
        println!("\n{}", "No upgrade can be applied safely".yellow());
        return;
    }

    println!("\n{}", "Update order:".cyan().bold());
    for (i, batch) in plan.batches.iter().enumerate() {
        println!("  {} {}", format!("Batch {}:", i + 1).yellow(), batch.join(" "));
    }

    println!(
        "\n{}",
        format!(
            "✨ {} upgrades in {} batches",
            plan.upgrade_count(),
            plan.batches.len()
        )
        .green()
        .bold()
    );
}

fn print_outcome(outcome: &PackageOutcome) {
    let name = outcome.name.white().bold();
    match &outcome.resolution {
        Resolution::Accepted { version } => {
            println!(
                "  {} {} {} → {}",
                "✓".green(),
                name,
                outcome.installed_version.red(),
                version.green().bold()
            );
        }
        Resolution::Substituted {
            proposed,
            version,
            conflicts,
        } => {
            println!(
                "  {} {} {} → {} {}",
                "~".yellow(),
                name,
                outcome.installed_version.red(),
                version.green().bold(),
                format!("(instead of {})", proposed).dimmed()
            );
            for conflict in conflicts {
                println!(
                    "      {} requires {}",
                    conflict.dependent,
                    conflict.constraint.yellow()
                );
            }
        }
        Resolution::RejectedByRequirements { proposed, conflicts } => {
            println!(
                "  {} {} {} → {} {}",
                "✗".red(),
                name,
                outcome.installed_version,
                proposed.red(),
                "(requirements unmet)".dimmed()
            );
            for conflict in conflicts {
                let fix = match &conflict.suggested_version {
                    Some(version) => format!("upgrade to {}", version).green(),
                    None => "no compatible release".red(),
                };
                println!(
                    "      needs {} {}, installed {}: {}",
                    conflict.package,
                    conflict.constraint.yellow(),
                    conflict.installed_version,
                    fix
                );
            }
        }
        Resolution::Unresolvable { proposed, conflicts } => {
            println!(
                "  {} {} {} → {} {}",
                "✗".red(),
                name,
                outcome.installed_version,
                proposed.red(),
                "(no compatible release)".dimmed()
            );
            for conflict in conflicts {
                println!(
                    "      {} requires {}",
                    conflict.dependent,
                    conflict.constraint.yellow()
                );
            }
        }
    }

    if let Some(impact) = &outcome.impact {
        if !impact.transitive.is_empty() {
            println!(
                "      {} {}",
                "also affects:".dimmed(),
                impact.transitive.join(", ")
            );
        }
    }
    if let Some(fallback) = &outcome.fallback_version {
        println!("      {} {}", "fallback:".dimmed(), fallback.green());
    }
    if let Some(alternative) = &outcome.alternative {
        println!(
            "      {} {}",
            "abandoned, consider:".dimmed(),
            alternative.cyan()
        );
    }
}

fn print_impact(package: &str, version: &str, report: &ImpactReport) {
    if report.is_empty() {
        println!(
            "\n{}",
            format!("✓ No installed package is affected by {} {}", package, version).green()
        );
        return;
    }

    println!("\n{}", "Direct conflicts:".cyan().bold());
    for (dependent, constraint) in &report.direct {
        println!("  • {} requires {}", dependent.white().bold(), constraint.yellow());
    }

    if !report.transitive.is_empty() {
        println!("\n{}", "Transitively affected:".cyan().bold());
        for name in &report.transitive {
            println!("  • {}", name);
        }
    }
}
