use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Environment wins, then a VERSION file at the repo root
    let version = if let Ok(v) = env::var("STUBATTR_VERSION") {
        Some(v)
    } else {
        let version_file = Path::new("VERSION");
        if version_file.exists() {
            fs::read_to_string(version_file)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        } else {
            None
        }
    };

    // Without either, version.rs falls back to CARGO_PKG_VERSION
    if let Some(version) = version {
        println!("cargo:rustc-env=STUBATTR_VERSION={}", version);
    }
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-env-changed=STUBATTR_VERSION");
}
