//! Wire format for the framelink relay channel.
//!
//! Every handshake stage and every application message travels as JSON text
//! in the fragment of a relay navigation. This crate knows nothing about
//! frames or hosts: it turns [`Envelope`] values into fragment text and back,
//! and composes/splits relay locations.
//!
//! # Stages
//!
//! | stage | envelope | fields |
//! |---|---|---|
//! | 1 | [`Request`] | `NA`, `URIA`, `originID`, `targetName` |
//! | 2 | [`Response`] | `NA`, `NB`, `URIB`, `originID` |
//! | 3 | [`Confirm`] | `NB` |
//! | 4 | [`Sealed`] | `NA`, `NB`, `message` |

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
mod fragment;

pub use envelope::{Confirm, Envelope, Request, Response, Sealed, Stage};
pub use errors::{Result, WireError};
pub use fragment::{compose_location, fragment_of, normalize_fragment, strip_fragment};
