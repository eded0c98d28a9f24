//! In-memory frame tree that executes channel actions.
//!
//! `SimWorld` plays the browser: it owns every frame, enforces the
//! same-origin access rule on channel state, turns relay navigations into
//! load and resize notifications, and runs a virtual clock for disposable
//! relay removal. Notifications are queued and processed one at a time,
//! mirroring a single-threaded event loop.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    time::Duration,
};

use framelink_core::{
    ChannelAction, ChannelConfig, ChannelContext, ChannelError, ChannelId, ChannelTarget, Endpoint,
    FrameId, FrameTree, Host, MessageEvent, Origin, Rejection, RelayEvent, on_relay_event,
};
use framelink_proto::strip_fragment;
use serde_json::Value;

use crate::sim_env::SimEnv;

/// Failures of harness-level operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No frame with this handle exists
    #[error("unknown frame {0}")]
    UnknownFrame(FrameId),

    /// Frame document has no origin, so no channel state
    #[error("frame {0} has no channel context")]
    NoContext(FrameId),

    /// Operation failed inside the channel layer
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

struct SimFrame {
    parent: Option<FrameId>,
    children: Vec<FrameId>,
    name: Option<String>,
    location: String,
    width: u32,
    context: Option<ChannelContext>,
}

/// Simulated frame hierarchy.
pub struct SimWorld {
    env: SimEnv,
    config: ChannelConfig,
    frames: BTreeMap<FrameId, SimFrame>,
    next_frame: u64,
    top: FrameId,
    /// Endpoint identity → its relay frame
    relays: HashMap<ChannelId, FrameId>,
    /// Disposable relays not yet loaded → grace period
    disposable: HashMap<FrameId, Duration>,
    queue: VecDeque<(FrameId, RelayEvent)>,
    /// (deadline, frame) pairs awaiting removal
    timers: Vec<(Duration, FrameId)>,
    now: Duration,
    rejections: Vec<Rejection>,
    delivered: usize,
}

impl SimWorld {
    /// World with a single top frame at `top_location`.
    ///
    /// Every frame created later gets `config` for its channel context.
    pub fn new(env: SimEnv, config: ChannelConfig, top_location: &str) -> Self {
        let mut world = Self {
            env,
            config,
            frames: BTreeMap::new(),
            next_frame: 0,
            top: FrameId(0),
            relays: HashMap::new(),
            disposable: HashMap::new(),
            queue: VecDeque::new(),
            timers: Vec::new(),
            now: Duration::ZERO,
            rejections: Vec::new(),
            delivered: 0,
        };
        world.top = world.insert_frame(None, None, top_location, 0);
        world
    }

    /// Append a document frame under `parent`.
    ///
    /// # Errors
    ///
    /// - `SimError::UnknownFrame` if `parent` does not exist
    pub fn add_frame(
        &mut self,
        parent: FrameId,
        name: Option<&str>,
        location: &str,
    ) -> Result<FrameId, SimError> {
        if !self.frames.contains_key(&parent) {
            return Err(SimError::UnknownFrame(parent));
        }
        Ok(self.insert_frame(Some(parent), name, location, 0))
    }

    fn insert_frame(
        &mut self,
        parent: Option<FrameId>,
        name: Option<&str>,
        location: &str,
        width: u32,
    ) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;

        let context = Origin::from_location(location)
            .ok()
            .map(|origin| ChannelContext::new(id, origin, self.config.clone()));

        self.frames.insert(id, SimFrame {
            parent,
            children: Vec::new(),
            name: name.map(str::to_string),
            location: location.to_string(),
            width,
            context,
        });

        if let Some(parent) = parent.and_then(|p| self.frames.get_mut(&p)) {
            parent.children.push(id);
        }

        id
    }

    /// Channel state of `frame`, bypassing the origin check.
    pub fn frame_context(&self, frame: FrameId) -> Option<&ChannelContext> {
        self.frames.get(&frame)?.context.as_ref()
    }

    /// Mutable channel state of `frame`, bypassing the origin check.
    pub fn frame_context_mut(&mut self, frame: FrameId) -> Option<&mut ChannelContext> {
        self.frames.get_mut(&frame)?.context.as_mut()
    }

    fn require_context(&mut self, frame: FrameId) -> Result<&mut ChannelContext, SimError> {
        let entry = self.frames.get_mut(&frame).ok_or(SimError::UnknownFrame(frame))?;
        entry.context.as_mut().ok_or(SimError::NoContext(frame))
    }

    /// Open a channel from `frame`. Does not run the event loop.
    ///
    /// # Errors
    ///
    /// - `SimError::UnknownFrame` / `SimError::NoContext` for a bad `frame`
    /// - `SimError::Channel` if the endpoint refuses its arguments
    pub fn open_channel(
        &mut self,
        frame: FrameId,
        target: ChannelTarget<'_>,
    ) -> Result<ChannelId, SimError> {
        let env = self.env.clone();
        let (id, actions) = self.require_context(frame)?.open_channel(&env, target)?;
        self.execute_all(actions);
        Ok(id)
    }

    /// Send over `channel` from `frame`. Does not run the event loop.
    ///
    /// # Errors
    ///
    /// - `SimError::UnknownFrame` / `SimError::NoContext` for a bad `frame`
    /// - `SimError::Channel` for unknown or not-ready channels
    pub fn send(
        &mut self,
        frame: FrameId,
        channel: &ChannelId,
        message: &Value,
    ) -> Result<(), SimError> {
        let action = self.require_context(frame)?.send(channel, message)?;
        self.execute(action);
        Ok(())
    }

    /// Register a subscriber in `frame`'s dispatcher.
    ///
    /// # Errors
    ///
    /// - `SimError::UnknownFrame` / `SimError::NoContext` for a bad `frame`
    pub fn subscribe<F>(
        &mut self,
        frame: FrameId,
        origin: Option<Origin>,
        callback: F,
    ) -> Result<(), SimError>
    where
        F: Fn(&MessageEvent) + 'static,
    {
        self.require_context(frame)?.subscribe(origin, callback);
        Ok(())
    }

    /// Endpoint `channel` hosted by `frame`.
    pub fn endpoint(&self, frame: FrameId, channel: &ChannelId) -> Option<&Endpoint> {
        self.frame_context(frame)?.endpoint(channel)
    }

    /// Relay frame owned by endpoint `channel`.
    pub fn relay_of(&self, channel: &ChannelId) -> Option<FrameId> {
        self.relays.get(channel).copied()
    }

    /// Number of frames in the tree, top included.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether `frame` is still in the tree.
    pub fn frame_exists(&self, frame: FrameId) -> bool {
        self.frames.contains_key(&frame)
    }

    /// Current width of `frame`.
    pub fn frame_width(&self, frame: FrameId) -> Option<u32> {
        self.frames.get(&frame).map(|f| f.width)
    }

    /// Every discarded relay event, oldest first.
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Number of `Deliver` and native deliveries that reached a dispatcher.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Virtual time since the world was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of queued notifications.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Overwrite `frame`'s fragment and queue `event` for it, as a hostile
    /// frame navigating a relay it can reach would.
    ///
    /// # Errors
    ///
    /// - `SimError::UnknownFrame` if `frame` does not exist
    pub fn inject_fragment(
        &mut self,
        frame: FrameId,
        fragment: &str,
        event: RelayEvent,
    ) -> Result<(), SimError> {
        let entry = self.frames.get_mut(&frame).ok_or(SimError::UnknownFrame(frame))?;
        entry.location = format!("{}#{fragment}", strip_fragment(&entry.location));
        self.queue.push_back((frame, event));
        Ok(())
    }

    /// Process one queued notification. Returns `false` when idle.
    pub fn step(&mut self) -> bool {
        let Some((frame, event)) = self.queue.pop_front() else {
            return false;
        };

        if !self.frames.contains_key(&frame) {
            tracing::trace!(%frame, ?event, "notification for removed frame dropped");
            return true;
        }

        if event == RelayEvent::Load
            && let Some(grace) = self.disposable.remove(&frame)
        {
            self.timers.push((self.now + grace, frame));
        }

        let env = self.env.clone();
        match on_relay_event(self, &env, frame, event) {
            Ok(actions) => self.execute_all(actions),
            Err(rejection) => self.rejections.push(rejection),
        }

        true
    }

    /// Process notifications until the queue is empty. Returns the count.
    pub fn run_until_idle(&mut self) -> usize {
        let mut steps = 0;
        while self.step() {
            steps += 1;
        }
        steps
    }

    /// Move the clock forward, removing disposable relays whose grace
    /// period has elapsed.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;

        let now = self.now;
        let (due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(deadline, _)| *deadline <= now);
        self.timers = pending;

        for (_, frame) in due {
            tracing::debug!(%frame, "disposable relay removed");
            self.remove_frame(frame);
        }
    }

    /// Tear down `frame` and everything nested in it. Queued notifications
    /// for removed frames are dropped.
    pub fn remove_frame(&mut self, frame: FrameId) {
        let Some(entry) = self.frames.remove(&frame) else {
            return;
        };

        if let Some(parent) = entry.parent.and_then(|p| self.frames.get_mut(&p)) {
            parent.children.retain(|child| *child != frame);
        }
        self.relays.retain(|_, relay| *relay != frame);

        for child in entry.children {
            self.remove_frame(child);
        }
    }

    fn execute_all(&mut self, actions: Vec<ChannelAction>) {
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: ChannelAction) {
        match action {
            ChannelAction::CreateRelay { owner, channel, location, width, .. } => {
                let relay = self.insert_frame(Some(owner), None, &location, width);
                self.relays.insert(channel, relay);
                self.queue.push_back((relay, RelayEvent::Load));
            },
            ChannelAction::NavigateRelay { channel, location, width, .. } => {
                let Some(relay) = self.relays.get(&channel).copied() else {
                    tracing::warn!(%channel, "navigation for a channel without relay");
                    return;
                };
                let Some(entry) = self.frames.get_mut(&relay) else {
                    return;
                };

                entry.location = location;
                if entry.width == width {
                    return;
                }
                entry.width = width;

                // A relay reads its fragment once per resize, so a pending
                // resize already covers this navigation.
                let pending = self
                    .queue
                    .iter()
                    .any(|(frame, event)| *frame == relay && *event == RelayEvent::Resize);
                if !pending {
                    self.queue.push_back((relay, RelayEvent::Resize));
                }
            },
            ChannelAction::SpawnDisposableRelay { parent, location, dispose_after } => {
                if !self.frames.contains_key(&parent) {
                    return;
                }
                let relay = self.insert_frame(Some(parent), None, &location, 0);
                self.disposable.insert(relay, dispose_after);
                self.queue.push_back((relay, RelayEvent::Load));
            },
            ChannelAction::Deliver { context, event } => {
                let Some(dispatcher) =
                    self.frame_context(context).map(|ctx| ctx.dispatcher().clone())
                else {
                    return;
                };
                dispatcher.dispatch(&event);
                self.delivered += 1;
            },
            ChannelAction::PostMessage { source, target, target_origin, data } => {
                self.post_message(source, target, &target_origin, &data);
            },
        }
    }

    fn post_message(
        &mut self,
        source: FrameId,
        target: FrameId,
        target_origin: &Origin,
        data: &str,
    ) {
        let Some(sender) = self.frame_context(source).map(|ctx| ctx.origin().clone()) else {
            return;
        };
        let Some(ctx) = self.frame_context(target) else {
            return;
        };

        if ctx.origin() != target_origin {
            tracing::debug!(
                %target,
                expected = %target_origin,
                actual = %ctx.origin(),
                "native message dropped"
            );
            return;
        }

        match ctx.handle_native_message(Some(source), sender, data) {
            Ok(event) => {
                let dispatcher = ctx.dispatcher().clone();
                dispatcher.dispatch(&event);
                self.delivered += 1;
            },
            Err(rejection) => self.rejections.push(rejection),
        }
    }
}

impl FrameTree for SimWorld {
    fn top(&self) -> FrameId {
        self.top
    }

    fn parent(&self, frame: FrameId) -> Option<FrameId> {
        self.frames.get(&frame)?.parent
    }

    fn children(&self, frame: FrameId) -> Vec<FrameId> {
        self.frames.get(&frame).map(|f| f.children.clone()).unwrap_or_default()
    }

    fn name(&self, frame: FrameId) -> Option<&str> {
        self.frames.get(&frame)?.name.as_deref()
    }

    fn location(&self, frame: FrameId) -> Option<&str> {
        self.frames.get(&frame).map(|f| f.location.as_str())
    }
}

impl Host for SimWorld {
    fn context(&self, accessor: FrameId, frame: FrameId) -> Option<&ChannelContext> {
        let origin = self.frame_context(accessor)?.origin();
        self.frame_context(frame).filter(|ctx| ctx.origin() == origin)
    }

    fn context_mut(&mut self, accessor: FrameId, frame: FrameId) -> Option<&mut ChannelContext> {
        let origin = self.frame_context(accessor)?.origin().clone();
        self.frame_context_mut(frame).filter(|ctx| *ctx.origin() == origin)
    }
}
