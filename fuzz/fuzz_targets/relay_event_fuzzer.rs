//! Fuzz target for the relay handshake state machine
//!
//! Drives a simulated two-origin hierarchy with an arbitrary mix of genuine
//! channel traffic and forged relay navigations.
//!
//! # Invariants
//!
//! - A discarded event never creates frames
//! - Every delivered message carries the initiator's origin

#![no_main]

use std::{cell::Cell, rc::Rc};

use arbitrary::Arbitrary;
use framelink_core::{ChannelConfig, ChannelTarget, FrameId, FrameTree, Origin, RelayEvent};
use framelink_harness::{SimEnv, SimWorld};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    /// Navigate an existing frame to arbitrary fragment text
    Inject { frame: u8, text: String, resize: bool },
    /// Append a fresh frame at one of the two proxy origins and load text
    Spawn { at_target: bool, text: String },
    /// Genuine send over the first channel
    Send { value: i32 },
    /// Tear down the first channel's relay
    DropRelay,
    /// Advance the virtual clock
    Advance { millis: u16 },
    /// Pump one notification
    Step,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let env = SimEnv::with_seed(input.seed);
    let mut world = SimWorld::new(env, ChannelConfig::default(), "https://a.example/app.html");
    let top = world.top();
    let Ok(target) = world.add_frame(top, Some("frame-b"), "https://b.example/app.html") else {
        return;
    };
    let Ok(initiator) = Origin::from_location("https://a.example") else {
        return;
    };
    let hits = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&hits);
    if world.subscribe(target, Some(initiator), move |_| counter.set(counter.get() + 1)).is_err() {
        return;
    }

    let Ok(channel) = world.open_channel(top, ChannelTarget {
        frame: target,
        name: "frame-b",
        proxy_location: "https://b.example/proxy.html",
        source_proxy_location: "https://a.example/proxy.html",
    }) else {
        return;
    };

    for op in input.ops.into_iter().take(64) {
        let frames_before = world.frame_count();
        let rejections_before = world.rejections().len();

        match op {
            Op::Inject { frame, text, resize } => {
                let frame = FrameId(u64::from(frame) % (world.frame_count() as u64 + 1));
                let event = if resize { RelayEvent::Resize } else { RelayEvent::Load };
                let _ = world.inject_fragment(frame, &text, event);
                world.step();
            },
            Op::Spawn { at_target, text } => {
                let location = if at_target {
                    "https://b.example/proxy.html"
                } else {
                    "https://a.example/proxy.html"
                };
                if let Ok(frame) = world.add_frame(top, None, location) {
                    let _ = world.inject_fragment(frame, &text, RelayEvent::Load);
                    world.step();
                }
            },
            Op::Send { value } => {
                let _ = world.send(top, &channel, &serde_json::json!(value));
            },
            Op::DropRelay => {
                if let Some(relay) = world.relay_of(&channel) {
                    world.remove_frame(relay);
                }
            },
            Op::Advance { millis } => {
                world.advance(std::time::Duration::from_millis(u64::from(millis)));
            },
            Op::Step => {
                world.step();
            },
        }

        if world.rejections().len() > rejections_before {
            assert!(world.frame_count() <= frames_before + 1, "rejected event created frames");
        }

        assert_eq!(world.delivered(), hits.get(), "delivery from an unexpected origin");
    }

    world.run_until_idle();
});
