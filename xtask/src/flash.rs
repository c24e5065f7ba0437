use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv7em-none-eabihf";
const CHIP: &str = "STM32H743ZITx";

fn profile(release: bool) -> &'static str {
    if release {
        "release"
    } else {
        "debug"
    }
}

fn elf_path(release: bool) -> String {
    format!("target/{TARGET}/{}/firmware", profile(release))
}

pub fn run(release: bool) -> Result<()> {
    println!();
    println!(
        "{}",
        format!("🔨 Building firmware ({} mode)...", profile(release))
            .cyan()
            .bold()
    );

    let build_start = Instant::now();
    let mut build = Command::new("cargo");
    build.args(["build", "-p", "firmware", "--bin", "firmware", "--target", TARGET, "--features", "hardware"]);
    if release {
        build.arg("--release");
    }
    let output = build.output().context("Failed to run cargo build")?;
    if !output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Build failed");
    }
    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", build_start.elapsed().as_secs_f64()).green()
    );
    print_size(&elf_path(release));
    println!();

    // probe-rs keeps running and streams the defmt log until Ctrl-C.
    println!("{}", format!("📡 Flashing {CHIP}...").cyan().bold());
    let status = Command::new("probe-rs")
        .args(["run", "--chip", CHIP, "--probe-index", "0"])
        .arg(elf_path(release))
        .status()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;
    if !status.success() {
        anyhow::bail!("Flash failed - check that the probe is connected and the box is powered");
    }
    Ok(())
}

fn print_size(elf: &str) {
    let Ok(out) = Command::new("rust-size").args(["-A", elf]).output() else {
        return;
    };
    if out.status.success() {
        println!("{}", "📊 Binary size:".cyan());
        for line in String::from_utf8_lossy(&out.stdout).lines() {
            println!("   {}", line.dimmed());
        }
    }
}
