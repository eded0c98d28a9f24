//! Relay-side handshake state machine.
//!
//! Each relay document carries one [`ProxyState`]. Load and resize
//! notifications for the relay feed its current fragment through
//! [`on_relay_event`], which advances the state by exactly one stage or
//! discards the event.
//!
//! # Stage Transitions
//!
//! ```text
//!       stage 1 (load)           stage 3 (resize)
//! None ─────────────────> Request ─────────────> Confirm ─┐
//!   │   stage 2 (load)                                    │ stage 4 (resize)
//!   └───────────────────> Response (terminal)             └─ deliver, repeat
//! ```
//!
//! A relay that sees stage 1 or 2 is claimed for good, even when a later
//! check fails: the fields are recorded before any lookup runs, so a failed
//! stage 1 leaves no target behind and the relay can never reach stage 3.

use framelink_proto::{
    Confirm, Envelope, Request, Response, Sealed, Stage, compose_location, fragment_of,
    strip_fragment,
};

use crate::{
    action::{ChannelAction, RelayEvent},
    config::ChannelConfig,
    dispatch::MessageEvent,
    endpoint::ChannelId,
    env::Environment,
    error::Rejection,
    host::{FrameId, Host},
    locator,
    origin::Origin,
    registry::OriginEntry,
};

/// Handshake state of one relay instance.
///
/// Never regresses. Discarded with the relay document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyState {
    stage: Option<Stage>,
    na: Option<String>,
    nb: Option<String>,
    uria: Option<String>,
    urib: Option<String>,
    origin_id: Option<ChannelId>,
    target: Option<FrameId>,
}

impl ProxyState {
    /// Whether no handshake field has been recorded yet.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Last accepted stage.
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Initiator nonce recorded by this relay.
    pub fn na(&self) -> Option<&str> {
        self.na.as_deref()
    }

    /// Responder nonce recorded by this relay.
    pub fn nb(&self) -> Option<&str> {
        self.nb.as_deref()
    }

    /// Initiator identity this relay serves.
    pub fn origin_id(&self) -> Option<&ChannelId> {
        self.origin_id.as_ref()
    }

    /// Frame resolved as the handshake's counterpart.
    pub fn target(&self) -> Option<FrameId> {
        self.target
    }

    /// Run one decoded fragment against this relay's state.
    ///
    /// # Errors
    ///
    /// Any [`Rejection`]. The state may have been claimed even so; see the
    /// module docs.
    pub fn handle<H: Host + ?Sized, E: Environment>(
        &mut self,
        host: &mut H,
        env: &E,
        config: &ChannelConfig,
        relay: FrameId,
        fragment: &str,
    ) -> Result<Vec<ChannelAction>, Rejection> {
        match Envelope::from_fragment(fragment)? {
            Envelope::Request(request) => self.on_request(host, env, config, relay, request),
            Envelope::Response(response) => self.on_response(host, relay, response),
            Envelope::Confirm(confirm) => self.on_confirm(host, relay, &confirm),
            Envelope::Message(sealed) => self.on_message(host, relay, sealed),
        }
    }

    fn claim(&mut self, stage: Stage) -> Result<(), Rejection> {
        if !self.is_empty() {
            return Err(Rejection::RelayClaimed);
        }
        self.stage = Some(stage);
        Ok(())
    }

    /// Stage 1, in the responder's relay.
    fn on_request<H: Host + ?Sized, E: Environment>(
        &mut self,
        host: &mut H,
        env: &E,
        config: &ChannelConfig,
        relay: FrameId,
        request: Request,
    ) -> Result<Vec<ChannelAction>, Rejection> {
        self.claim(Stage::Request)?;

        let origin_id = ChannelId::from(request.origin_id);
        self.na = Some(request.na.clone());
        self.uria = Some(request.uria.clone());
        self.origin_id = Some(origin_id.clone());

        let not_found = || Rejection::TargetNotFound(request.target_name.clone());

        let target =
            locator::find_by_name(host, relay, &request.target_name).ok_or_else(not_found)?;
        let urib = host
            .location(target)
            .map(|l| strip_fragment(l).to_string())
            .ok_or_else(not_found)?;
        let responder = host.context_mut(relay, target).ok_or_else(not_found)?;

        let nb = env.unique_id();
        let response = Envelope::Response(Response {
            na: request.na.clone(),
            nb: nb.clone(),
            urib: urib.clone(),
            origin_id: origin_id.to_string(),
        });
        let location = compose_location(&request.uria, &response)?;

        let entry = OriginEntry { na: request.na, uria: request.uria, nb, urib: urib.clone() };
        if !responder.origins_mut().register(origin_id.clone(), entry) {
            return Err(Rejection::DuplicateInitiator(origin_id));
        }

        self.urib = Some(urib);
        self.target = Some(target);

        tracing::debug!(%relay, %target, initiator = %origin_id, "stage 1 accepted");

        Ok(vec![ChannelAction::SpawnDisposableRelay {
            parent: target,
            location,
            dispose_after: config.dispose_after,
        }])
    }

    /// Stage 2, in the disposable relay at the initiator's origin.
    fn on_response<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        relay: FrameId,
        response: Response,
    ) -> Result<Vec<ChannelAction>, Rejection> {
        self.claim(Stage::Response)?;

        let origin_id = ChannelId::from(response.origin_id.as_str());
        self.na = Some(response.na.clone());
        self.nb = Some(response.nb.clone());
        self.urib = Some(response.urib.clone());
        self.origin_id = Some(origin_id.clone());

        let owner = locator::find_by_channel(host, relay, &origin_id)
            .ok_or_else(|| Rejection::EndpointNotFound(origin_id.clone()))?;
        self.target = Some(owner);

        let endpoint = host
            .context_mut(relay, owner)
            .and_then(|ctx| ctx.endpoint_mut(&origin_id))
            .ok_or_else(|| Rejection::EndpointNotFound(origin_id.clone()))?;

        let action = endpoint.accept_response(&response)?;

        tracing::debug!(%relay, %owner, channel = %origin_id, "stage 2 accepted");

        Ok(vec![action])
    }

    /// Stage 3, in the responder's relay.
    fn on_confirm<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        relay: FrameId,
        confirm: &Confirm,
    ) -> Result<Vec<ChannelAction>, Rejection> {
        let mismatch = Rejection::StageMismatch { current: self.stage, received: Stage::Confirm };

        if self.stage != Some(Stage::Request) || self.na.is_none() || self.uria.is_none() {
            return Err(mismatch);
        }
        let (Some(origin_id), Some(target)) = (&self.origin_id, self.target) else {
            return Err(mismatch);
        };

        let entry = host
            .context(relay, target)
            .and_then(|ctx| ctx.origins().get(origin_id))
            .ok_or_else(|| Rejection::UnknownInitiator(origin_id.clone()))?;

        if entry.nb != confirm.nb {
            return Err(Rejection::NonceMismatch);
        }

        tracing::debug!(%relay, %target, initiator = %origin_id, "stage 3 accepted");

        self.stage = Some(Stage::Confirm);
        self.nb = Some(confirm.nb.clone());

        Ok(Vec::new())
    }

    /// Stage 4, in the responder's authenticated relay.
    fn on_message<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        relay: FrameId,
        sealed: Sealed,
    ) -> Result<Vec<ChannelAction>, Rejection> {
        let mismatch = Rejection::StageMismatch { current: self.stage, received: Stage::Message };

        if self.stage != Some(Stage::Confirm) {
            return Err(mismatch);
        }
        let (Some(na), Some(nb), Some(origin_id), Some(target)) =
            (&self.na, &self.nb, &self.origin_id, self.target)
        else {
            return Err(mismatch);
        };

        if sealed.na != *na || sealed.nb != *nb {
            return Err(Rejection::NonceMismatch);
        }

        let uria = host
            .context(relay, target)
            .and_then(|ctx| ctx.origins().get(origin_id))
            .map(|entry| entry.uria.clone())
            .ok_or_else(|| Rejection::UnknownInitiator(origin_id.clone()))?;
        let origin = Origin::from_location(&uria)?;
        let source = host.parent(relay);

        Ok(vec![ChannelAction::Deliver {
            context: target,
            event: MessageEvent { data: sealed.message, source, origin },
        }])
    }
}

/// Process a load or resize notification for `relay`.
///
/// Reads the relay's current fragment, runs it against the relay's
/// [`ProxyState`], and returns the actions the host must execute. A
/// rejection is logged at debug level and returned; the host must not
/// report it anywhere the peer could observe.
///
/// # Errors
///
/// Any [`Rejection`].
pub fn on_relay_event<H: Host + ?Sized, E: Environment>(
    host: &mut H,
    env: &E,
    relay: FrameId,
    event: RelayEvent,
) -> Result<Vec<ChannelAction>, Rejection> {
    let location = host.location(relay).ok_or(Rejection::RelayUnavailable)?.to_string();

    let ctx = host.context_mut(relay, relay).ok_or(Rejection::RelayUnavailable)?;
    let mut state = ctx.take_proxy_state();
    let config = ctx.config().clone();

    let result = state.handle(host, env, &config, relay, fragment_of(&location));

    if let Some(ctx) = host.context_mut(relay, relay) {
        ctx.restore_proxy_state(state);
    }

    match &result {
        Ok(actions) => {
            tracing::trace!(%relay, ?event, actions = actions.len(), "relay event handled");
        },
        Err(rejection) => tracing::debug!(%relay, ?event, %rejection, "relay event discarded"),
    }

    result
}
