use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Unit,
    Integration,
    Doc,
}

impl Suite {
    fn label(self) -> &'static str {
        match self {
            Suite::Unit => "unit tests",
            Suite::Integration => "integration tests",
            Suite::Doc => "doc tests",
        }
    }

    fn args(self) -> &'static [&'static str] {
        match self {
            Suite::Unit => &["test", "--workspace", "--lib", "--bins"],
            Suite::Integration => &["test", "--workspace", "--test", "*"],
            Suite::Doc => &["test", "--workspace", "--doc"],
        }
    }
}

pub fn selected(unit_only: bool, integration_only: bool) -> Vec<Suite> {
    match (unit_only, integration_only) {
        (true, false) => vec![Suite::Unit],
        (false, true) => vec![Suite::Integration],
        _ => vec![Suite::Unit, Suite::Integration, Suite::Doc],
    }
}

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();
    for suite in selected(unit_only, integration_only) {
        println!("{}", format!("  Running {}...", suite.label()).cyan());
        let start = Instant::now();
        let output = Command::new("cargo")
            .args(suite.args())
            .output()
            .with_context(|| format!("Failed to run {}", suite.label()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} failed", suite.label()).red().bold());
            eprintln!();
            for line in stdout.lines().filter(|l| !l.starts_with("test ") || l.ends_with("FAILED")) {
                eprintln!("  {}", line);
            }
            anyhow::bail!("{} failed", suite.label());
        }

        let (passed, ignored) = tally(&stdout);
        println!(
            "{}",
            format!(
                "  ✓ {} passed ({} passed, {} ignored) in {:.2}s",
                suite.label(),
                passed,
                ignored,
                start.elapsed().as_secs_f64()
            )
            .green()
        );
        println!();
    }

    println!(
        "{}",
        format!("✓ All tests completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
    Ok(())
}

/// Sum the counts of every `test result:` line; a workspace run prints one
/// per test binary.
fn tally(output: &str) -> (u32, u32) {
    let count = |summary: &str, what: &str| -> u32 {
        summary
            .split(';')
            .find_map(|part| part.trim().strip_suffix(what))
            .and_then(|n| n.trim().rsplit(' ').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    };
    output
        .lines()
        .filter_map(|line| line.split("test result:").nth(1))
        .fold((0, 0), |(passed, ignored), summary| {
            (
                passed.saturating_add(count(summary, "passed")),
                ignored.saturating_add(count(summary, "ignored")),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_adds_up_every_binary() {
        let out = "\
test result: ok. 5 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.01s
running 3 tests
test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.00s
";
        assert_eq!(tally(out), (8, 1));
    }

    #[test]
    fn flags_pick_suites() {
        assert_eq!(selected(true, false), vec![Suite::Unit]);
        assert_eq!(selected(false, true), vec![Suite::Integration]);
        assert_eq!(selected(false, false).len(), 3);
    }
}
