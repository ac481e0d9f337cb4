//! Structural checks that the bundled GLSL kernel agrees with `KernelContract`.

use vkmatmul_vulkan::kernels::{KernelContract, MATMUL_GLSL, SpirvValidator, default_kernel_path};
use vkmatmul_vulkan::pipeline::{KernelBinary, layout_bindings, push_constant_range};

// ---------------------------------------------------------------------------
// Source shape
// ---------------------------------------------------------------------------

#[test]
fn source_declares_version_450() {
    assert!(MATMUL_GLSL.contains("#version 450"));
}

#[test]
fn source_defines_entry_point() {
    let entry = KernelContract::ENTRY_POINT.to_str().unwrap();
    assert!(MATMUL_GLSL.contains(&format!("void {entry}()")), "missing void {entry}()");
}

#[test]
fn source_workgroup_is_square_contract_size() {
    let wg = KernelContract::WORKGROUP_SIZE;
    assert!(MATMUL_GLSL.contains(&format!("local_size_x = {wg}")));
    assert!(MATMUL_GLSL.contains(&format!("local_size_y = {wg}")));
    assert!(MATMUL_GLSL.contains("local_size_z = 1"));
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

#[test]
fn source_declares_every_contract_binding() {
    for binding in [KernelContract::BINDING_A, KernelContract::BINDING_B, KernelContract::BINDING_C] {
        let decl = format!("set = 0, binding = {binding})");
        assert!(MATMUL_GLSL.contains(&decl), "binding {binding} not declared");
    }
}

#[test]
fn source_declares_exactly_buf_count_buffers() {
    let count = MATMUL_GLSL.matches(") readonly buffer").count() + MATMUL_GLSL.matches(") writeonly buffer").count();
    assert_eq!(count as u32, KernelContract::BUF_COUNT);
}

#[test]
fn output_binding_is_writeonly() {
    let decl = format!("binding = {}) writeonly buffer", KernelContract::BINDING_C);
    assert!(MATMUL_GLSL.contains(&decl));
}

#[test]
fn storage_buffers_use_std430() {
    assert_eq!(MATMUL_GLSL.matches("layout(std430").count() as u32, KernelContract::BUF_COUNT);
}

#[test]
fn host_layout_matches_source_bindings() {
    let host: Vec<u32> = layout_bindings().iter().map(|b| b.binding).collect();
    assert_eq!(host, vec![KernelContract::BINDING_A, KernelContract::BINDING_B, KernelContract::BINDING_C]);
}

// ---------------------------------------------------------------------------
// Push constants
// ---------------------------------------------------------------------------

#[test]
fn source_declares_single_uint_push_constant() {
    assert!(MATMUL_GLSL.contains("layout(push_constant)"));
    assert!(MATMUL_GLSL.contains("uint N;"));
    assert_eq!(push_constant_range().size, KernelContract::PUSH_CONSTANT_SIZE);
}

#[test]
fn source_bounds_checks_dimension() {
    assert!(MATMUL_GLSL.contains("row >= n || col >= n"));
}

// ---------------------------------------------------------------------------
// Compiled kernel
// ---------------------------------------------------------------------------

#[test]
fn glsl_source_is_not_spirv() {
    assert!(SpirvValidator::validate_bytes(MATMUL_GLSL.as_bytes()).is_err());
}

#[test]
fn compiled_kernel_passes_blob_checks_when_present() {
    let path = default_kernel_path();
    if !path.exists() {
        eprintln!("skipping: {} not built (glslc unavailable)", path.display());
        return;
    }
    let kernel = KernelBinary::load(&path).unwrap();
    assert!(kernel.byte_len() >= 20);
    assert_eq!(kernel.words()[0], vkmatmul_vulkan::kernels::SPIRV_MAGIC);
}
