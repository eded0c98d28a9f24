//! Per-frame channel state.
//!
//! Every frame that takes part in the protocol carries one
//! [`ChannelContext`]: the endpoints it opened, the responder secrets it
//! agreed, its subscribers, and (when the frame is a relay document) the
//! relay's handshake state. Nothing here is global; two frames never share
//! a context, and a context is only mutated while its own frame's code runs.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    action::ChannelAction,
    config::ChannelConfig,
    dispatch::{Dispatcher, MessageEvent},
    endpoint::{ChannelId, ChannelTarget, Endpoint},
    env::Environment,
    error::{ChannelError, Rejection},
    host::FrameId,
    origin::Origin,
    proxy::ProxyState,
    registry::OriginRegistry,
};

/// Channel state owned by one frame.
#[derive(Debug)]
pub struct ChannelContext {
    frame: FrameId,
    origin: Origin,
    config: ChannelConfig,
    endpoints: HashMap<ChannelId, Endpoint>,
    origins: OriginRegistry,
    dispatcher: Dispatcher,
    proxy: ProxyState,
}

impl ChannelContext {
    /// Fresh state for `frame`, whose document is at `origin`.
    pub fn new(frame: FrameId, origin: Origin, config: ChannelConfig) -> Self {
        Self {
            frame,
            origin,
            config,
            endpoints: HashMap::new(),
            origins: OriginRegistry::new(),
            dispatcher: Dispatcher::new(),
            proxy: ProxyState::default(),
        }
    }

    /// Frame owning this state.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Origin of the owning frame's document.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Configuration applied to endpoints opened here.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Open a channel to `target`.
    ///
    /// Returns the new channel's identity and the actions that start its
    /// handshake. The endpoint is registered under that identity before
    /// any action runs, so a response can always find it.
    ///
    /// # Errors
    ///
    /// See [`Endpoint::open`].
    pub fn open_channel<E: Environment>(
        &mut self,
        env: &E,
        target: ChannelTarget<'_>,
    ) -> Result<(ChannelId, Vec<ChannelAction>), ChannelError> {
        let (endpoint, actions) =
            Endpoint::open(env, &self.config, self.frame, &self.origin, target)?;
        let id = endpoint.id().clone();
        self.endpoints.insert(id.clone(), endpoint);
        Ok((id, actions))
    }

    /// Send `message` over the channel `id`.
    ///
    /// # Errors
    ///
    /// - `ChannelError::UnknownChannel` if no endpoint `id` lives here
    /// - otherwise see [`Endpoint::send`]
    pub fn send<T: Serialize + ?Sized>(
        &mut self,
        id: &ChannelId,
        message: &T,
    ) -> Result<ChannelAction, ChannelError> {
        self.endpoints
            .get_mut(id)
            .ok_or_else(|| ChannelError::UnknownChannel(id.clone()))?
            .send(message)
    }

    /// Endpoint `id`, if it lives here.
    pub fn endpoint(&self, id: &ChannelId) -> Option<&Endpoint> {
        self.endpoints.get(id)
    }

    /// Mutable endpoint `id`, if it lives here.
    pub fn endpoint_mut(&mut self, id: &ChannelId) -> Option<&mut Endpoint> {
        self.endpoints.get_mut(id)
    }

    /// Whether this context hosts endpoint `id`.
    pub fn hosts_channel(&self, id: &ChannelId) -> bool {
        self.endpoints.contains_key(id)
    }

    /// Identities of every endpoint opened here, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.endpoints.keys()
    }

    /// Register `callback` for messages from `origin`, or from this frame's
    /// own origin when `None`.
    pub fn subscribe<F>(&self, origin: Option<Origin>, callback: F)
    where
        F: Fn(&MessageEvent) + 'static,
    {
        let origin = origin.unwrap_or_else(|| self.origin.clone());
        self.dispatcher.subscribe(origin, callback);
    }

    /// Subscriber registry of this frame.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Responder secrets agreed by this frame.
    pub fn origins(&self) -> &OriginRegistry {
        &self.origins
    }

    /// Mutable responder secrets.
    pub fn origins_mut(&mut self) -> &mut OriginRegistry {
        &mut self.origins
    }

    /// Handshake state of this frame when it is a relay document.
    pub fn proxy_state(&self) -> &ProxyState {
        &self.proxy
    }

    /// Move the relay state out, leaving an empty one behind.
    pub fn take_proxy_state(&mut self) -> ProxyState {
        std::mem::take(&mut self.proxy)
    }

    /// Put relay state back after processing an event.
    pub fn restore_proxy_state(&mut self, state: ProxyState) {
        self.proxy = state;
    }

    /// Turn a message received over the native primitive into an event.
    ///
    /// The host has already checked that the message was addressed to this
    /// frame's origin; `source_origin` is what the host reports for the
    /// sender.
    ///
    /// # Errors
    ///
    /// - `Rejection::Malformed` if `data` is not JSON text
    pub fn handle_native_message(
        &self,
        source: Option<FrameId>,
        source_origin: Origin,
        data: &str,
    ) -> Result<MessageEvent, Rejection> {
        let data = serde_json::from_str(data).map_err(framelink_proto::WireError::from)?;
        Ok(MessageEvent { data, source, origin: source_origin })
    }
}
