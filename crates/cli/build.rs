// Build metadata for `pxlog --version`: commit, target triple and profile.

use std::env;
use std::process::Command;

fn git_commit() -> Option<String> {
    let output = Command::new("git").args(["describe", "--always", "--dirty", "--abbrev=8"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    Some(commit.trim().to_owned()).filter(|c| !c.is_empty())
}

fn emit(key: &str, value: Option<String>) {
    println!("cargo:rustc-env={}={}", key, value.as_deref().unwrap_or("unknown"));
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    emit("PXLOG_BUILD_COMMIT", git_commit());
    emit("PXLOG_BUILD_TARGET", env::var("TARGET").ok());
    emit("PXLOG_BUILD_PROFILE", env::var("PROFILE").ok());
}
