use std::process::Command;

/// Build-time workspace defaults. Empty values mean "no default".
const DEFAULT_ENV_VARS: [&str; 3] = [
    "ADO_MOBILE_DEFAULT_ORG",
    "ADO_MOBILE_DEFAULT_PROJECT",
    "ADO_MOBILE_DEFAULT_API_BASE",
];

fn main() {
    // Tell cargo to rerun build.rs if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/heads");

    // Compiled-in workspace defaults; the binary persists a signature of these
    // so that a rebuild with different values invalidates stale stored config.
    for var in DEFAULT_ENV_VARS {
        println!("cargo::rerun-if-env-changed={}", var);
        let value = std::env::var(var).unwrap_or_default();
        println!("cargo::rustc-env={}={}", var, value.trim());
    }

    // Get the short git hash (8 characters)
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo::rustc-env=GIT_HASH={}", git_hash);
}
