// Stamps DISHCOVERY_VERSION into the binary. Release pipelines may replace the patch segment
// through DISHCOVERY_PATCH_VERSION.

use std::env;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");

    let mut parts = version.splitn(3, '.');
    let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next()) else {
        panic!("Invalid version format in Cargo.toml: {}", version);
    };

    let patch = match env::var("DISHCOVERY_PATCH_VERSION") {
        Ok(run_number) if run_number.parse::<u64>().is_ok() => run_number,
        Ok(other) => panic!("DISHCOVERY_PATCH_VERSION must be a number, got '{}'", other),
        Err(_) => patch.to_string(),
    };

    println!("cargo:rustc-env=DISHCOVERY_VERSION={}.{}.{}", major, minor, patch);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=DISHCOVERY_PATCH_VERSION");
}
