//! Puts `memory.x` on the linker search path for board builds. Host builds
//! (tests, emulator) link normally and skip it.

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    if std::env::var_os("CARGO_FEATURE_HARDWARE").is_none() {
        return Ok(());
    }

    let out = std::path::PathBuf::from(std::env::var_os("OUT_DIR").unwrap_or_default());
    std::fs::write(out.join("memory.x"), include_bytes!("../../memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=../../memory.x");
    Ok(())
}
