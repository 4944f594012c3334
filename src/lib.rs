//! Problemset backend library: upstream client, filtering/sorting core,
//! HTTP routes and server lifecycle. The binary in `main.rs` wires them up.

pub mod config;
pub mod domain;
pub mod logic;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod upstream;
pub mod util;

pub use config::AppConfig;
pub use routes::build_router;
pub use server::{Server, StopOutcome};
pub use state::AppState;
