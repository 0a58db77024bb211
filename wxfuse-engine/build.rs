//! Stamps the `wxfuse` binary with the revision it was built from.
//!
//! Exposed to the crate as compile-time env vars:
//! - `WXFUSE_GIT_REV`: `git describe` output, `-dirty` when the tree has edits
//! - `WXFUSE_BUILT_AT`: UTC build time, or `SOURCE_DATE_EPOCH` when set
//! - `WXFUSE_PROFILE`: cargo profile

use chrono::{DateTime, SecondsFormat, Utc};
use std::env;
use std::process::Command;

fn main() {
    let rev = git(&["describe", "--always", "--dirty", "--abbrev=8"])
        .unwrap_or_else(|| "unknown".to_string());

    let built_at = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=WXFUSE_GIT_REV={}", rev);
    println!("cargo:rustc-env=WXFUSE_BUILT_AT={}", built_at);
    println!("cargo:rustc-env=WXFUSE_PROFILE={}", profile);

    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=build.rs");
    if let Some(head) = git(&["rev-parse", "--git-path", "HEAD"]) {
        println!("cargo:rerun-if-changed={}", head);
    }
}

/// Trimmed stdout of a successful git command
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
