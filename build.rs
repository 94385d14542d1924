use std::process::Command;

/// Short hash of the checked-out commit, if built from a git checkout
fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}

fn main() {
    let built_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let commit = commit_hash().unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_WAYBACK_BUILT_AT={}", built_at);
    println!("cargo:rustc-env=GIT_WAYBACK_COMMIT={}", commit);
    println!(
        "cargo:rustc-env=GIT_WAYBACK_LONG_VERSION={} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        commit,
        built_at
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
