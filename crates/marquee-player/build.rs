//! Build script for marquee-player
//!
//! Compiles the gRPC protocol definitions from `proto/marquee_player.proto`
//! into Rust code used by the player to talk to the cloud API.
//!
//! ## Generated Code
//! The proto compilation generates:
//! - The PlayerService client stub
//! - Message types matching the .proto definitions
//! - Serialization/deserialization code via prost

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Path to the proto file (relative to crate root)
    let proto_file = "../../proto/marquee_player.proto";

    // Only recompile if the proto file changes
    println!("cargo:rerun-if-changed={}", proto_file);

    // Configure tonic-build for client generation only
    // The server side lives in the cloud API, not in this repository
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&[proto_file], &["../../proto"])?;

    Ok(())
}
