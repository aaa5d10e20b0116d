//! Build Script for Inventory Service
//!
//! Generates Rust protobuf stubs from workspace proto definitions.
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
    let proto_files = ["stockroom/v1/inventory.proto"];

    for proto in &proto_files {
        println!("cargo:rerun-if-changed={}", proto_root.join(proto).display());
    }

    // protox parses the protos in-process, so no protoc or buf is needed in PATH.
    let fds = protox::compile(proto_files, [&proto_root])
        .expect("Failed to parse inventory proto definitions");

    tonic_prost_build::configure()
        .build_client(true) // Client is used by integration tests
        .build_server(true)
        .compile_fds(fds)
        .expect("Failed to compile protobuf definitions");
}
