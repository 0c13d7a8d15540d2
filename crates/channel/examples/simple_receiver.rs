//! Minimal consumer: polls channel `swiftchannel_demo` until it has seen
//! ten records or thirty seconds pass.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use swiftchannel::{ChannelConfig, Receiver};
use zerocopy::{FromBytes, Immutable, KnownLayout};

#[derive(FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct Telemetry {
    sequence: u64,
    value: f64,
    label: [u8; 32],
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ChannelConfig {
        ring_buffer_size: 64 * 1024,
        max_message_size: 1024,
        ..Default::default()
    };

    let mut receiver =
        Receiver::connect("swiftchannel_demo", config).context("failed to open demo channel")?;

    let deadline = Instant::now() + Duration::from_secs(30);
    let mut seen = 0u32;

    while seen < 10 && Instant::now() < deadline {
        let got = receiver.poll_one(|bytes| match Telemetry::read_from_bytes(bytes) {
            Ok(record) => {
                let label = record
                    .label
                    .split(|&b| b == 0)
                    .next()
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default();
                tracing::info!(
                    sequence = record.sequence,
                    value = record.value,
                    %label,
                    "received record"
                );
            }
            Err(_) => tracing::warn!(len = bytes.len(), "message with unexpected layout"),
        })?;

        if got {
            seen += 1;
        } else {
            thread::sleep(Duration::from_millis(5));
        }
    }

    let stats = receiver.stats();
    tracing::info!(
        messages = stats.messages_received,
        bytes = stats.bytes_received,
        "done"
    );
    Ok(())
}
