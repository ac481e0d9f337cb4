use std::{env, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=shaders/matmul.comp");
    println!("cargo:rerun-if-env-changed=GLSLC");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let source = PathBuf::from("shaders").join("matmul.comp");
    let output = out_dir.join("matmul.spv");

    // Allow pointing at a specific compiler (e.g. from the Vulkan SDK).
    let glslc = env::var("GLSLC").unwrap_or_else(|_| "glslc".to_string());

    let status = Command::new(&glslc)
        .arg("-fshader-stage=compute")
        .arg("--target-env=vulkan1.1")
        .arg("-O")
        .arg(&source)
        .arg("-o")
        .arg(&output)
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:rustc-env=VKMATMUL_MATMUL_SPV={}", output.display());
        }
        Ok(s) => {
            println!("cargo:warning={glslc} failed on {} ({s}); using shaders/matmul.spv at runtime", source.display());
        }
        Err(_) => {
            println!("cargo:warning={glslc} not found; using shaders/matmul.spv at runtime");
        }
    }
}
