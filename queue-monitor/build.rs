fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=../target/vcpkg/installed/vcpkg/status");

    // The default backend runs the tesseract executable, nothing to link.
    if std::env::var_os("CARGO_FEATURE_TESSERACT").is_none() {
        return;
    }

    let tesseract_found = vcpkg::find_package("tesseract");
    let leptonica_found = vcpkg::find_package("leptonica");

    if tesseract_found.is_err() {
        println!("cargo:warning=Missing vcpkg dependency: tesseract");
    }

    if leptonica_found.is_err() {
        println!("cargo:warning=Missing vcpkg dependency: leptonica");
    }

    // Outside of MSVC the system libraries are usually found via pkg-config
    // by the `tesseract` crate itself, so only Windows requires vcpkg.
    let is_msvc = std::env::var("CARGO_CFG_TARGET_ENV").map_or(false, |env| env == "msvc");
    if is_msvc && (tesseract_found.is_err() || leptonica_found.is_err()) {
        eprintln!("Please install the missing dependencies with cargo-vcpkg");
        eprintln!("Run the following commands:");
        eprintln!();
        eprintln!("cargo install cargo-vcpkg");
        eprintln!("cargo vcpkg build");
        eprintln!();
        eprintln!("Then try cargo build again.");
        panic!("Missing vcpkg dependencies");
    }
}
