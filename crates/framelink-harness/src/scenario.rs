//! Scenario framework for end-to-end channel runs.
//!
//! A scenario builds a two-frame world (a top frame at the source origin
//! with one named child at the target origin), opens a channel from the top
//! frame to the child, pumps the handshake, sends a batch of messages, and
//! hands the resulting world to an oracle.
//!
//! ```text
//! top (source)/app.html
//! ├── <target_name> (target)/app.html
//! │   └── disposable relay (source)/proxy.html#stage-2
//! └── relay (target)/proxy.html#stage-1..4
//! ```

use std::{cell::RefCell, rc::Rc, time::Duration};

use framelink_core::{
    ChannelConfig, ChannelId, ChannelMode, ChannelTarget, FrameId, FrameTree, MessageEvent, Origin,
};

use crate::{
    sim_env::SimEnv,
    sim_world::{SimError, SimWorld},
};

/// Oracle run against the finished world.
pub type Oracle = Box<dyn Fn(&ScenarioWorld) -> Result<(), String>>;

/// Failures of a scenario run.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// World construction or a channel call failed
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A configured origin is not `scheme://authority`
    #[error("invalid origin {0:?}")]
    InvalidOrigin(String),

    /// Oracle rejected the outcome
    #[error("oracle failed: {0}")]
    Oracle(String),
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Origin of the initiating top frame
    pub source_origin: String,
    /// Origin of the target child frame
    pub target_origin: String,
    /// Declared name of the target frame
    pub target_name: String,
    /// Messages sent after the handshake
    pub messages: usize,
    /// RNG seed
    pub seed: u64,
    /// Transport for the channel
    pub mode: ChannelMode,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            source_origin: "https://a.example".to_string(),
            target_origin: "https://b.example".to_string(),
            target_name: "frame-b".to_string(),
            messages: 3,
            seed: 0,
            mode: ChannelMode::Fragment,
        }
    }
}

/// World after a run, with the handles an oracle needs.
pub struct ScenarioWorld {
    /// Simulated frame tree
    pub world: SimWorld,
    /// Initiating frame
    pub source: FrameId,
    /// Target frame
    pub target: FrameId,
    /// Channel opened from `source` to `target`
    pub channel: ChannelId,
    received: Rc<RefCell<Vec<MessageEvent>>>,
}

impl ScenarioWorld {
    /// Events the target's subscriber saw, in delivery order.
    pub fn received(&self) -> Vec<MessageEvent> {
        self.received.borrow().clone()
    }

    /// Whether the channel finished its handshake.
    pub fn is_ready(&self) -> bool {
        self.world.endpoint(self.source, &self.channel).is_some_and(|e| e.is_ready())
    }
}

/// Builder for a scenario run.
pub struct Scenario {
    config: ScenarioConfig,
    time_advance: Option<Duration>,
    oracle: Option<Oracle>,
}

impl Scenario {
    /// Scenario with default parameters.
    pub fn new() -> Self {
        Self::with_config(ScenarioConfig::default())
    }

    /// Scenario with explicit parameters.
    pub fn with_config(config: ScenarioConfig) -> Self {
        Self { config, time_advance: None, oracle: None }
    }

    /// Number of messages to send after the handshake.
    #[must_use]
    pub fn with_messages(mut self, messages: usize) -> Self {
        self.config.messages = messages;
        self
    }

    /// Advance the clock by `by` after the messages are sent.
    #[must_use]
    pub fn with_time_advance(mut self, by: Duration) -> Self {
        self.time_advance = Some(by);
        self
    }

    /// Oracle checked against the final world.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Run the scenario.
    ///
    /// # Errors
    ///
    /// - `ScenarioError::InvalidOrigin` for a malformed configured origin
    /// - `ScenarioError::Sim` if opening or sending fails
    /// - `ScenarioError::Oracle` if the oracle rejects the outcome
    pub fn run(self) -> Result<ScenarioWorld, ScenarioError> {
        let ScenarioConfig { source_origin, target_origin, target_name, messages, seed, mode } =
            self.config;

        let source = Origin::from_location(&source_origin)
            .map_err(|_| ScenarioError::InvalidOrigin(source_origin.clone()))?;
        Origin::from_location(&target_origin)
            .map_err(|_| ScenarioError::InvalidOrigin(target_origin.clone()))?;

        let config = ChannelConfig { mode, ..ChannelConfig::default() };
        let mut world =
            SimWorld::new(SimEnv::with_seed(seed), config, &format!("{source_origin}/app.html"));
        let top = world.top();
        let target =
            world.add_frame(top, Some(&target_name), &format!("{target_origin}/app.html"))?;

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        world.subscribe(target, Some(source), move |event| sink.borrow_mut().push(event.clone()))?;

        let target_proxy = format!("{target_origin}/proxy.html");
        let source_proxy = format!("{source_origin}/proxy.html");
        let channel = world.open_channel(top, ChannelTarget {
            frame: target,
            name: &target_name,
            proxy_location: &target_proxy,
            source_proxy_location: &source_proxy,
        })?;

        let steps = world.run_until_idle();
        tracing::debug!(%channel, steps, "handshake pumped");

        for seq in 0..messages {
            world.send(top, &channel, &serde_json::json!({ "seq": seq }))?;
            world.run_until_idle();
        }

        if let Some(by) = self.time_advance {
            world.advance(by);
        }

        let outcome = ScenarioWorld { world, source: top, target, channel, received };

        if let Some(oracle) = &self.oracle {
            oracle(&outcome).map_err(ScenarioError::Oracle)?;
        }

        Ok(outcome)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}
