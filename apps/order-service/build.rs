//! Build Script for Order Service
//!
//! Generates Rust protobuf stubs from workspace proto definitions. The order
//! proto imports the inventory messages, so both files land in one
//! `stockroom.v1` module.
//!
//! # Panics Policy
//!
//! Build scripts use `.expect()` and panic on failure: there is no caller to
//! propagate errors to, and a descriptive panic halts the build with a clear
//! message.
#![allow(clippy::expect_used)]

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let proto_root = manifest_dir.join("../../packages/proto");
    let proto_files = ["stockroom/v1/inventory.proto", "stockroom/v1/order.proto"];

    for proto in &proto_files {
        println!("cargo:rerun-if-changed={}", proto_root.join(proto).display());
    }

    let fds = protox::compile(proto_files, [&proto_root])
        .expect("Failed to parse order proto definitions");

    tonic_prost_build::configure()
        .build_client(true) // InventoryService client; OrderService client for tests
        .build_server(true)
        .compile_fds(fds)
        .expect("Failed to compile protobuf definitions");
}
