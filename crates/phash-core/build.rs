fn main() {
    #[cfg(feature = "libphash")]
    native::build();
}

/// Compile the C shim over libpHash and link the library
#[cfg(feature = "libphash")]
mod native {
    use std::env;

    const SHIM: &str = "native/phash_shim.cpp";

    pub fn build() {
        println!("cargo:rerun-if-changed={}", SHIM);
        println!("cargo:rerun-if-env-changed=PHASH_INCLUDE_DIR");
        println!("cargo:rerun-if-env-changed=PHASH_LIB_DIR");

        let mut shim = cc::Build::new();
        shim.cpp(true).file(SHIM).warnings(false);
        if let Ok(include) = env::var("PHASH_INCLUDE_DIR") {
            shim.include(include);
        }
        shim.compile("phash_shim");

        if let Ok(lib) = env::var("PHASH_LIB_DIR") {
            println!("cargo:rustc-link-search=native={}", lib);
        }
        println!("cargo:rustc-link-lib=pHash");
    }
}
