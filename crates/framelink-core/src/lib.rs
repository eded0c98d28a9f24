//! Core
//!
//! Sans-IO implementation of the framelink channel: a confidential,
//! mutually authenticated message channel between two frames of possibly
//! different origins, built on nothing stronger than "a frame can navigate a
//! nested frame" and "a frame can read its own fragment".
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O. The host (a browser binding, or the
//! simulation in `framelink-harness`) feeds relay notifications into
//! [`on_relay_event`] and application intents into [`ChannelContext`], and
//! executes the returned [`ChannelAction`]s: creating and navigating relay
//! frames, scheduling disposal, and handing [`MessageEvent`]s to dispatch.
//!
//! # Handshake
//!
//! A four-stage exchange modelled on Needham-Schroeder-Lowe. A is the
//! initiator (owner of the [`Endpoint`]), B the responder frame.
//!
//! ```text
//!  A                          relay (B origin)               B
//!  │ 1: NA,URIA,id,name ──────>│ load: resolve name,           │
//!  │                           │ register {NA,URIA,NB,URIB} ──>│
//!  │<──── 2: NA,NB,URIB,id ────┼───── disposable relay ────────│
//!  │ 3: NB (resize) ──────────>│ stage 1 → 3                   │
//!  │ 4: NA,NB,msg (resize) ───>│ verify pair ── MessageEvent ─>│
//! ```
//!
//! Every failed check discards the event. Nothing is reported to the peer.
//!
//! # Trust model
//!
//! Nonces travel in fragment text, which is visible in history and to any
//! same-origin code with access to a relay. The channel is authenticated and
//! confidential only under the assumption that no hostile code shares the
//! frame hierarchy with access to relay navigation state. It is not
//! encryption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod endpoint;
pub mod env;
pub mod error;
pub mod host;
pub mod locator;
pub mod origin;
pub mod proxy;
pub mod registry;
mod system_env;

pub use action::{ChannelAction, RelayEvent};
pub use config::{ChannelConfig, ChannelMode, RelayGeometry};
pub use context::ChannelContext;
pub use dispatch::{DispatchRegistry, Dispatcher, MessageEvent, Subscriber};
pub use endpoint::{ChannelId, ChannelTarget, Endpoint};
pub use env::Environment;
pub use error::{ChannelError, Rejection};
pub use host::{FrameId, FrameTree, Host};
pub use origin::{Origin, OriginError};
pub use proxy::{ProxyState, on_relay_event};
pub use registry::{OriginEntry, OriginRegistry};
pub use system_env::SystemEnv;
