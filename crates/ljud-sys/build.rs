//! Build script for ljud-sys.
//!
//! With the `ud-sdk` feature the crate links against the vendor `LabJackUD`
//! library. Without it, the crate provides stand-in functions and nothing is
//! linked, so the workspace builds on machines without the driver installed.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=LABJACKUD_LIB_DIR");

    if env::var_os("CARGO_FEATURE_UD_SDK").is_none() {
        return;
    }

    if let Ok(dir) = env::var("LABJACKUD_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    } else {
        // Default install locations of the UD driver
        let lib_paths = [
            "C:\\Windows\\System32",
            "C:\\Program Files (x86)\\LabJack\\Drivers",
            "/usr/local/lib",
            "/usr/lib",
        ];

        for path in lib_paths {
            let dir = Path::new(path);
            if dir.join("LabJackUD.lib").exists()
                || dir.join("LabJackUD.dll").exists()
                || dir.join("libLabJackUD.so").exists()
            {
                println!("cargo:rustc-link-search=native={}", path);
                break;
            }
        }
    }

    println!("cargo:rustc-link-lib=LabJackUD");
}
