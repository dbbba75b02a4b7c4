//! Strata Bus - The plugin bus for the Strata host.
//!
//! The bus owns everything between the game engine's callbacks and the
//! plugin child processes:
//!
//! - **Transport** ([`transport`]): a length-prefixed frame stream per plugin
//!   over loopback TCP or a Unix domain socket, with a listener the plugins
//!   dial into.
//! - **Supervisor** ([`process`]): spawns configured child processes with
//!   endpoint info injected through the environment and tails their stdio
//!   into the host log.
//! - **Sessions** ([`session`]): per-plugin bookkeeping (bounded send
//!   queue, receive loop, subscription set, pending-reply table) that
//!   survives transport reconnects.
//! - **Router** ([`router`]): fans events out to subscribed sessions in
//!   parallel and aggregates responses under one shared deadline.
//! - **Mutation appliers** ([`emit`]): write plugin-returned mutations back
//!   into the mutable fields the engine callback exposes.
//! - **Action dispatcher** ([`actions`]): applies plugin action batches via
//!   the engine's per-world transaction executor.
//! - **Registry** ([`registry`]): world, player and command directories.
//! - **Host** ([`host`]): bootstrap and lifecycle tying it all together.
//!
//! The engine side of every interaction is abstracted behind the port traits
//! in `strata-core`; the bus never blocks an engine callback for longer than
//! the per-event response deadline.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod actions;
mod commands;
mod emit;
pub mod error;
pub mod host;
mod inbound;
mod mutate;
mod process;
pub mod registry;
mod router;
mod session;
pub mod transport;

pub use error::{BusError, BusResult};
pub use host::PluginHost;
pub use registry::Registry;
pub use router::EVENT_RESPONSE_TIMEOUT;
pub use transport::{BusListener, FrameStream, ListenAddr, TransportError};
