//! Minimal producer: sends ten telemetry records on channel
//! `swiftchannel_demo`. Run `simple_receiver` in another terminal first or
//! after; either order works.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use swiftchannel::{ChannelConfig, ChannelError, Sender};
use zerocopy::{Immutable, IntoBytes};

#[derive(IntoBytes, Immutable)]
#[repr(C)]
struct Telemetry {
    sequence: u64,
    value: f64,
    label: [u8; 32],
}

impl Telemetry {
    fn new(sequence: u64) -> Self {
        let mut label = [0u8; 32];
        let text = format!("reading_{sequence}");
        label[..text.len()].copy_from_slice(text.as_bytes());
        Self {
            sequence,
            value: sequence as f64 * 0.1,
            label,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ChannelConfig {
        ring_buffer_size: 64 * 1024,
        max_message_size: 1024,
        ..Default::default()
    };

    let mut sender =
        Sender::connect("swiftchannel_demo", config).context("failed to open demo channel")?;

    for i in 0..10 {
        let record = Telemetry::new(i);
        loop {
            match sender.send(&record) {
                Ok(()) => {
                    tracing::info!(sequence = i, "sent record");
                    break;
                }
                Err(ChannelError::ChannelFull) => thread::sleep(Duration::from_millis(1)),
                Err(other) => return Err(other).context("send failed"),
            }
        }
        thread::sleep(Duration::from_millis(50));
    }

    let stats = sender.stats();
    tracing::info!(
        messages = stats.messages_sent,
        bytes = stats.bytes_sent,
        "done"
    );
    Ok(())
}
