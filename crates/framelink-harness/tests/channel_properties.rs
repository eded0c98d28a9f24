//! Property-based tests for channel behavior.
//!
//! Arbitrary event sequences are injected into relays; the properties hold
//! for every sequence: forged traffic never readies an endpoint, never
//! creates frames, never reaches a subscriber.

use framelink_core::{
    ChannelConfig, ChannelId, ChannelTarget, FrameId, FrameTree, Rejection, RelayEvent,
};
use framelink_harness::{Scenario, ScenarioConfig, SimEnv, SimWorld};
use proptest::prelude::*;

/// Fragment an attacker sharing the hierarchy might navigate a relay to.
#[derive(Debug, Clone)]
enum Forged {
    Request { na: String, genuine_id: bool },
    Response { na: String, nb: String, urib: &'static str, genuine_id: bool },
    Confirm { nb: String },
    Message { na: String, nb: String },
    Junk(String),
}

impl Forged {
    fn render(&self, channel: &ChannelId) -> String {
        let id = |genuine: bool| {
            if genuine { channel.to_string() } else { "someone-else".to_string() }
        };
        match self {
            Self::Request { na, genuine_id } => format!(
                concat!(
                    r#"{{"stage":1,"NA":"{}","URIA":"https://a.example/proxy.html","#,
                    r#""originID":"{}","targetName":"frame-b"}}"#,
                ),
                na,
                id(*genuine_id)
            ),
            Self::Response { na, nb, urib, genuine_id } => format!(
                r#"{{"stage":2,"NA":"{na}","NB":"{nb}","URIB":"{urib}","originID":"{}"}}"#,
                id(*genuine_id)
            ),
            Self::Confirm { nb } => format!(r#"{{"stage":3,"NB":"{nb}"}}"#),
            Self::Message { na, nb } => {
                format!(r#"{{"stage":4,"NA":"{na}","NB":"{nb}","message":"x"}}"#)
            },
            Self::Junk(text) => text.clone(),
        }
    }
}

fn nonce() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

fn forged_strategy() -> impl Strategy<Value = Forged> {
    prop_oneof![
        (nonce(), any::<bool>())
            .prop_map(|(na, genuine_id)| Forged::Request { na, genuine_id }),
        (
            nonce(),
            nonce(),
            prop_oneof![Just("https://b.example/app.html"), Just("https://evil.example/")],
            any::<bool>(),
        )
            .prop_map(|(na, nb, urib, genuine_id)| Forged::Response { na, nb, urib, genuine_id }),
        nonce().prop_map(|nb| Forged::Confirm { nb }),
        (nonce(), nonce()).prop_map(|(na, nb)| Forged::Message { na, nb }),
        "[ -~]{0,40}".prop_map(Forged::Junk),
    ]
}

/// Where a forged fragment lands.
#[derive(Debug, Clone, Copy)]
enum Landing {
    /// New frame at the initiator's proxy origin, fresh load
    FreshAtSource,
    /// New frame at the responder's proxy origin, fresh load
    FreshAtTarget,
    /// Re-navigation of the most recent forged frame
    Renavigate,
}

fn landing_strategy() -> impl Strategy<Value = Landing> {
    prop_oneof![
        Just(Landing::FreshAtSource),
        Just(Landing::FreshAtTarget),
        Just(Landing::Renavigate),
    ]
}

/// Initiator at a.example, target "frame-b" at b.example, channel opened and
/// its genuine relay torn down before it ever loads.
fn orphaned_channel(seed: u64) -> (SimWorld, FrameId, ChannelId) {
    let env = SimEnv::with_seed(seed);
    let mut world = SimWorld::new(env, ChannelConfig::default(), "https://a.example/app.html");
    let top = world.top();
    let target = world.add_frame(top, Some("frame-b"), "https://b.example/app.html").unwrap();

    let channel = world
        .open_channel(top, ChannelTarget {
            frame: target,
            name: "frame-b",
            proxy_location: "https://b.example/proxy.html",
            source_proxy_location: "https://a.example/proxy.html",
        })
        .unwrap();

    let relay = world.relay_of(&channel).unwrap();
    world.remove_frame(relay);

    (world, top, channel)
}

proptest! {
    /// Without the genuine handshake, no injected sequence readies the
    /// endpoint, and sending keeps failing.
    #[test]
    fn prop_no_premature_readiness(
        seed in any::<u64>(),
        events in prop::collection::vec((landing_strategy(), forged_strategy()), 0..30),
    ) {
        let (mut world, top, channel) = orphaned_channel(seed);
        let mut last = None;

        for (landing, forged) in events {
            let fragment = forged.render(&channel);
            let (frame, event) = match (landing, last) {
                (Landing::Renavigate, Some(frame)) => (frame, RelayEvent::Resize),
                (Landing::FreshAtTarget, _) => {
                    let fresh = world.add_frame(top, None, "https://b.example/proxy.html").unwrap();
                    (fresh, RelayEvent::Load)
                },
                _ => {
                    let fresh = world.add_frame(top, None, "https://a.example/proxy.html").unwrap();
                    (fresh, RelayEvent::Load)
                },
            };
            last = Some(frame);

            world.inject_fragment(frame, &fragment, event).unwrap();
            world.run_until_idle();

            let endpoint = world.endpoint(top, &channel).unwrap();
            prop_assert!(!endpoint.is_ready(), "ready after {:?}", forged);
            prop_assert_eq!(endpoint.nb(), None);
            prop_assert!(world.send(top, &channel, &serde_json::json!("x")).is_err());
        }
    }

    /// Arbitrary text on an authenticated relay is discarded: one rejection
    /// per injection, no new frames, nothing delivered.
    #[test]
    fn prop_rejection_has_no_effect(texts in prop::collection::vec("[ -~]{0,60}", 1..20)) {
        let mut outcome = Scenario::new().with_messages(1).run().unwrap();
        let relay = outcome.world.relay_of(&outcome.channel).unwrap();
        let frames = outcome.world.frame_count();

        for (i, text) in texts.iter().enumerate() {
            outcome.world.inject_fragment(relay, text, RelayEvent::Resize).unwrap();
            outcome.world.run_until_idle();

            prop_assert_eq!(outcome.world.rejections().len(), i + 1);
            prop_assert_eq!(outcome.world.frame_count(), frames);
            prop_assert_eq!(outcome.world.delivered(), 1);
        }

        prop_assert_eq!(outcome.received().len(), 1);
    }

    /// N sends over one authenticated relay deliver N events, once each, in
    /// send order.
    #[test]
    fn prop_delivery_count_matches_sends(messages in 0usize..25) {
        let outcome = Scenario::new().with_messages(messages).run().unwrap();

        let seqs: Vec<_> = outcome.received().iter().map(|e| e.data["seq"].as_u64()).collect();
        let expected: Vec<_> = (0..messages as u64).map(Some).collect();
        prop_assert_eq!(seqs, expected);
        prop_assert!(outcome.world.rejections().is_empty());
    }

    /// Every seed completes the handshake with agreeing nonces.
    #[test]
    fn prop_handshake_agrees_for_any_seed(seed in any::<u64>()) {
        let outcome = Scenario::with_config(ScenarioConfig {
            seed,
            messages: 0,
            ..Default::default()
        })
        .run()
        .unwrap();

        let endpoint = outcome.world.endpoint(outcome.source, &outcome.channel).unwrap();
        let relay = outcome.world.relay_of(&outcome.channel).unwrap();
        let state = outcome.world.frame_context(relay).unwrap().proxy_state();

        prop_assert!(endpoint.is_ready());
        prop_assert_eq!(state.na(), Some(endpoint.na()));
        prop_assert_eq!(state.nb(), endpoint.nb());
    }
}

#[test]
fn forged_response_with_genuine_id_but_wrong_nonce_is_rejected() {
    let (mut world, top, channel) = orphaned_channel(5);
    let relay = world.add_frame(top, None, "https://a.example/proxy.html").unwrap();
    let fragment = Forged::Response {
        na: "guess".to_string(),
        nb: "nb".to_string(),
        urib: "https://b.example/app.html",
        genuine_id: true,
    }
    .render(&channel);

    world.inject_fragment(relay, &fragment, RelayEvent::Load).unwrap();
    world.run_until_idle();

    assert_eq!(world.rejections(), [Rejection::NonceMismatch]);
    assert!(!world.endpoint(top, &channel).unwrap().is_ready());
}
