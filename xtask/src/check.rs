use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Crates that must build without `std` for the board.
const NO_STD_CRATES: [&str; 6] = ["platform", "input", "keycard", "playback", "settings", "activity"];

const TARGET: &str = "thumbv7em-none-eabihf";

struct Step {
    label: &'static str,
    args: Vec<&'static str>,
    /// Failure stops the run; otherwise it is only reported.
    fatal: bool,
}

fn steps() -> Vec<Step> {
    let mut steps = vec![
        Step {
            label: "firmware (STM32H7, hardware)",
            args: vec!["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
            fatal: true,
        },
        Step {
            label: "firmware (host, emulator)",
            args: vec!["check", "-p", "firmware", "--features", "emulator", "--examples"],
            fatal: true,
        },
    ];
    for krate in NO_STD_CRATES {
        steps.push(Step {
            label: krate,
            args: vec!["check", "-p", krate, "--target", TARGET, "--no-default-features"],
            fatal: true,
        });
    }
    steps.push(Step {
        label: "clippy",
        args: vec!["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        fatal: false,
    });
    steps.push(Step {
        label: "rustfmt",
        args: vec!["fmt", "--all", "--check"],
        fatal: false,
    });
    steps
}

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking Tonbox builds...".cyan().bold());
    println!();

    let total_start = Instant::now();
    for step in steps() {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();
        let output = Command::new("cargo")
            .args(&step.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", step.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!("  ✓ {} passed in {:.2}s", step.label, start.elapsed().as_secs_f64()).green()
            );
        } else if step.fatal {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", step.label);
        } else {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
        println!();
    }

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
    Ok(())
}
