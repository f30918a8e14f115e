//! Build script for the storefront crate.
//!
//! Fingerprints static assets so pages can reference them with
//! long-lived cache headers:
//!
//! - `static/css/main.css` is copied to `static/css/derived/main.{hash}.css`
//!   and the hash is exposed as `CSS_HASH`.
//! - The page scripts under `static/js/` share one combined hash, exposed
//!   as `JS_HASH` and appended to their URLs as a `?v=` query.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const SCRIPTS: &[&str] = &["checkout.js", "register.js"];

fn main() {
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo"));
    let static_dir = manifest_dir.join("static");

    fingerprint_stylesheet(&static_dir);
    fingerprint_scripts(&static_dir);
}

/// First 8 hex chars of the SHA-256 over every input.
fn short_hash<'a>(inputs: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    let hash = format!("{:x}", hasher.finalize());
    hash.chars().take(8).collect()
}

fn read_asset(path: &Path) -> Option<Vec<u8>> {
    println!("cargo:rerun-if-changed={}", path.display());
    match fs::read(path) {
        Ok(content) => Some(content),
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", path.display());
            None
        }
    }
}

fn fingerprint_stylesheet(static_dir: &Path) {
    let css_path = static_dir.join("css/main.css");
    let Some(content) = read_asset(&css_path) else {
        println!("cargo:rustc-env=CSS_HASH=");
        return;
    };

    let hash = short_hash([content.as_slice()]);
    println!("cargo:rustc-env=CSS_HASH={hash}");

    let derived_dir = static_dir.join("css/derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived CSS directory");
    fs::write(derived_dir.join(format!("main.{hash}.css")), &content)
        .expect("Failed to write fingerprinted CSS");
}

fn fingerprint_scripts(static_dir: &Path) {
    let scripts: Vec<Vec<u8>> = SCRIPTS
        .iter()
        .filter_map(|name| read_asset(&static_dir.join("js").join(name)))
        .collect();

    let hash = short_hash(scripts.iter().map(Vec::as_slice));
    println!("cargo:rustc-env=JS_HASH={hash}");
}
