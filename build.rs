//! Build script for the PhaseLink firmware
//!
//! Handles:
//! - Memory layout configuration
//! - Board identity selection (`PHASELINK_BOARD_ID`, 1 or 2, default 1)

fn main() {
    // Tell Cargo to re-run this if the linker script changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PHASELINK_BOARD_ID");

    // Link memory.x from project directory
    if let Ok(dir) = std::env::var("CARGO_MANIFEST_DIR") {
        println!("cargo:rustc-link-search={dir}");
    }

    let board_id = std::env::var("PHASELINK_BOARD_ID").unwrap_or_else(|_| String::from("1"));
    let board_id = board_id.trim();
    if board_id != "1" && board_id != "2" {
        panic!("PHASELINK_BOARD_ID must be 1 or 2, got `{board_id}`");
    }
    println!("cargo:rustc-env=PHASELINK_BOARD_ID={board_id}");
}
