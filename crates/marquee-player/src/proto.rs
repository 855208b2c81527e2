//! Generated gRPC client code for the player/cloud protocol.
//!
//! This module includes the Rust code generated from
//! `proto/marquee_player.proto`. It provides the client stub for the
//! PlayerService exposed by the cloud API.
//!
//! ## Services Available
//! - `PlayerServiceClient` - Heartbeat, content fetch, command poll/report

// Include the generated code from build.rs
tonic::include_proto!("marquee.player.v1");
