//! Channel endpoints.
//!
//! An [`Endpoint`] is the initiator side of one directional channel. It
//! owns exactly one relay frame for its whole life: stage 1 loads the relay,
//! stage 3 and every stage 4 re-navigate it. `ready` flips once, when a
//! validated stage 2 response lets the endpoint send its stage 3
//! confirmation; nothing ever clears it.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────┐  stage 2 ok   ┌───────┐
//! │ Awaiting │──────────────>│ Ready │──┐ send: stage 4
//! └──────────┘  (NB stored)  └───────┘<─┘
//!      │ stage 2 rejected: stays Awaiting
//! ```

use std::fmt;

use framelink_proto::{Confirm, Envelope, Request, Response, Sealed, compose_location};
use serde::Serialize;

use crate::{
    action::ChannelAction,
    config::{ChannelConfig, ChannelMode, RelayGeometry},
    env::Environment,
    error::{ChannelError, Rejection},
    host::FrameId,
    origin::Origin,
};

/// Identity of an endpoint, unique across every context that might talk
/// to it. Travels in the handshake as `originID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(String);

impl ChannelId {
    /// Identity text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a new channel points.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTarget<'a> {
    /// Frame that will receive messages
    pub frame: FrameId,
    /// Its logical name: a declared frame name, `"parent"` or `"top"`
    pub name: &'a str,
    /// Proxy document served from the target's origin
    pub proxy_location: &'a str,
    /// Proxy document served from our own origin
    pub source_proxy_location: &'a str,
}

/// Initiator side of one directional channel.
#[derive(Debug, Clone)]
pub struct Endpoint {
    id: ChannelId,
    owner: FrameId,
    mode: ChannelMode,
    geometry: RelayGeometry,

    target_frame: FrameId,
    target_name: String,
    target_proxy: String,
    source_proxy: String,
    source_origin: Origin,
    target_origin: Origin,

    /// Our nonce
    na: String,
    /// Responder nonce, learned from stage 2
    nb: Option<String>,
    /// Current relay width
    relay_width: u32,
    ready: bool,
}

impl Endpoint {
    /// Construct an endpoint and start its handshake.
    ///
    /// In fragment mode the returned actions create the relay, already
    /// navigated to the target proxy with the stage 1 request. In native
    /// mode the endpoint is ready immediately and no action is needed.
    ///
    /// # Errors
    ///
    /// - `ChannelError::MissingArgument` if any location or the name is empty
    /// - `ChannelError::InvalidLocation` if the target proxy has no origin
    pub fn open<E: Environment>(
        env: &E,
        config: &ChannelConfig,
        owner: FrameId,
        owner_origin: &Origin,
        target: ChannelTarget<'_>,
    ) -> Result<(Self, Vec<ChannelAction>), ChannelError> {
        if target.name.is_empty() {
            return Err(ChannelError::MissingArgument("target_name"));
        }
        if target.proxy_location.is_empty() {
            return Err(ChannelError::MissingArgument("target_proxy_location"));
        }
        if target.source_proxy_location.is_empty() {
            return Err(ChannelError::MissingArgument("source_proxy_location"));
        }

        let target_origin = Origin::from_location(target.proxy_location)?;

        let mut endpoint = Self {
            id: ChannelId::from(env.unique_id()),
            owner,
            mode: config.mode,
            geometry: config.relay,
            target_frame: target.frame,
            target_name: target.name.to_string(),
            target_proxy: target.proxy_location.to_string(),
            source_proxy: target.source_proxy_location.to_string(),
            source_origin: owner_origin.clone(),
            target_origin,
            na: env.unique_id(),
            nb: None,
            relay_width: config.relay.narrow,
            ready: false,
        };

        if endpoint.mode == ChannelMode::Native {
            endpoint.ready = true;
            tracing::debug!(
                channel = %endpoint.id,
                target = %endpoint.target_origin,
                "native channel opened"
            );
            return Ok((endpoint, Vec::new()));
        }

        let request = Envelope::Request(Request {
            na: endpoint.na.clone(),
            uria: endpoint.source_proxy.clone(),
            origin_id: endpoint.id.to_string(),
            target_name: endpoint.target_name.clone(),
        });
        let location = compose_location(&endpoint.target_proxy, &request)?;

        tracing::debug!(
            channel = %endpoint.id,
            target = %endpoint.target_origin,
            "handshake started"
        );

        let action = ChannelAction::CreateRelay {
            owner,
            channel: endpoint.id.clone(),
            location,
            width: endpoint.relay_width,
            height: endpoint.geometry.height,
        };

        Ok((endpoint, vec![action]))
    }

    /// Endpoint identity.
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Frame hosting this endpoint.
    pub fn owner(&self) -> FrameId {
        self.owner
    }

    /// Transport mode.
    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Frame this channel sends to.
    pub fn target_frame(&self) -> FrameId {
        self.target_frame
    }

    /// Logical name of the target frame.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Target proxy location.
    pub fn target_proxy(&self) -> &str {
        &self.target_proxy
    }

    /// Our own proxy location.
    pub fn source_proxy(&self) -> &str {
        &self.source_proxy
    }

    /// Origin of the frame hosting this endpoint.
    pub fn source_origin(&self) -> &Origin {
        &self.source_origin
    }

    /// Origin the responder must prove.
    pub fn target_origin(&self) -> &Origin {
        &self.target_origin
    }

    /// Our nonce.
    pub fn na(&self) -> &str {
        &self.na
    }

    /// Responder nonce. `None` until a stage 2 response is accepted.
    pub fn nb(&self) -> Option<&str> {
        self.nb.as_deref()
    }

    /// Current relay width.
    pub fn relay_width(&self) -> u32 {
        self.relay_width
    }

    /// Whether `send` will transmit.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Accept a stage 2 response and produce the stage 3 confirmation.
    ///
    /// Runs in our own context, reached through the disposable relay the
    /// responder created at our proxy location.
    ///
    /// # Errors
    ///
    /// - `Rejection::NativeChannel` for native endpoints
    /// - `Rejection::Replay` if a responder nonce was already accepted
    /// - `Rejection::NonceMismatch` if the echoed `NA` is not ours
    /// - `Rejection::OriginMismatch` if `URIB` is not at our target origin
    pub fn accept_response(&mut self, response: &Response) -> Result<ChannelAction, Rejection> {
        if self.mode == ChannelMode::Native {
            return Err(Rejection::NativeChannel(self.id.clone()));
        }

        if self.nb.is_some() {
            return Err(Rejection::Replay(self.id.clone()));
        }

        if response.na != self.na {
            return Err(Rejection::NonceMismatch);
        }

        let responder = Origin::from_location(&response.urib)?;
        if responder != self.target_origin {
            return Err(Rejection::OriginMismatch {
                expected: self.target_origin.to_string(),
                found: responder.to_string(),
            });
        }

        let confirm = Envelope::Confirm(Confirm { nb: response.nb.clone() });
        let location = compose_location(&self.target_proxy, &confirm)?;

        self.nb = Some(response.nb.clone());
        self.ready = true;

        tracing::debug!(channel = %self.id, "handshake confirmed, channel ready");

        Ok(self.navigate(location))
    }

    /// Send `message` to the target.
    ///
    /// Nothing is queued: a send on a channel that is not ready fails and
    /// has no effect.
    ///
    /// # Errors
    ///
    /// - `ChannelError::NotReady` before the handshake completed
    /// - `ChannelError::Encode` if `message` has no JSON form
    pub fn send<T: Serialize + ?Sized>(
        &mut self,
        message: &T,
    ) -> Result<ChannelAction, ChannelError> {
        if !self.ready {
            return Err(ChannelError::NotReady(self.id.clone()));
        }

        if self.mode == ChannelMode::Native {
            let data =
                serde_json::to_string(message).map_err(|e| ChannelError::Encode(e.to_string()))?;

            return Ok(ChannelAction::PostMessage {
                source: self.owner,
                target: self.target_frame,
                target_origin: self.target_origin.clone(),
                data,
            });
        }

        let Some(nb) = self.nb.as_deref() else {
            return Err(ChannelError::NotReady(self.id.clone()));
        };

        let sealed = Envelope::Message(Sealed::new(&self.na, nb, message)?);
        let location = compose_location(&self.target_proxy, &sealed)?;

        Ok(self.navigate(location))
    }

    fn navigate(&mut self, location: String) -> ChannelAction {
        self.relay_width = self.geometry.toggle(self.relay_width);

        ChannelAction::NavigateRelay {
            owner: self.owner,
            channel: self.id.clone(),
            location,
            width: self.relay_width,
        }
    }
}
