//! Build-time hints for locating the FFmpeg libraries that `ffmpeg-next`
//! links against. Discovery itself happens in `ffmpeg-sys-next`; this only
//! warns when a Windows build is likely to miss them.

use std::env;
use std::path::Path;

const WATCHED: [&str; 3] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!("cargo:warning=Neither FFMPEG_DIR nor VCPKG_ROOT is set; the FFmpeg libraries may not be found.");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = Path::new(&vcpkg_root).join("installed").join(triplet);
    if install.is_dir() {
        println!(
            "cargo:warning=Found a vcpkg FFmpeg install; set FFMPEG_DIR={} to use it explicitly.",
            install.display()
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not exist.",
            install.display()
        );
    }
}
