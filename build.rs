//! Build script for led-wall: picks the linker memory map for the target chip.

use std::{env, error::Error, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET")?;
    let memory_file = if target.starts_with("thumbv8m") {
        // Pico 2 ARM
        "memory-pico2.x"
    } else if target.starts_with("thumbv6m") {
        // Pico 1
        "memory-pico1.x"
    } else {
        // Host builds and tests link normally.
        return Ok(());
    };

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let memory_x = fs::read_to_string(memory_file)
        .map_err(|err| format!("failed to read {memory_file}: {err}"))?;
    fs::write(out_dir.join("memory.x"), memory_x)?;
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed={memory_file}");

    // Only the firmware binary needs the cortex-m-rt and defmt linker scripts.
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    Ok(())
}
