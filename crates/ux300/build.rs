// Exposes the target triple and the build profile to `ux300 version --extended`.
fn main() {
    for (var, exported) in [
        ("TARGET", "UX300_BUILD_TARGET"),
        ("PROFILE", "UX300_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
