//! Typed access to the source/target node JSON-RPC methods the engine depends
//! on (§4.A, §6), plus the bounded-concurrency fan-out helper every pipeline
//! stage is built from (§5).

pub mod batching;
pub mod client;
pub mod trace;

pub use batching::batched;
pub use client::{NodeSide, RpcClient, RpcError};
pub use trace::{StateDiffEntry, TraceReplayResponse};
