// Root re-exports for workspace crates used by the demo binary.
pub use data_runtime as data;
pub use net_core as net;
pub use server_core as server;

pub mod demo;
