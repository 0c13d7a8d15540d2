//! Producer endpoint.

use tracing::debug;
use zerocopy::{Immutable, IntoBytes};

use crate::channel::Channel;
use crate::config::ChannelConfig;
use crate::errors::{ChannelError, Result};
use crate::handshake::Role;
use crate::ring::WriteOutcome;

/// Endpoint-local send counters. Kept out of the shared region.
#[derive(Debug, Clone, Copy, Default)]
pub struct SenderStats {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub send_errors: u64,
}

/// The writing end of a channel.
///
/// Connecting creates the shared region if it does not exist yet; the
/// receiver may equally well have created it first.
#[derive(Debug)]
pub struct Sender {
    name: String,
    config: ChannelConfig,
    channel: Option<Channel>,
    stats: SenderStats,
}

impl Sender {
    pub fn connect(name: &str, config: ChannelConfig) -> Result<Self> {
        let channel = Channel::open(name, &config, Role::Sender)?;
        debug!(channel = name, "sender connected");
        Ok(Self {
            name: name.to_string(),
            config,
            channel: Some(channel),
            stats: SenderStats::default(),
        })
    }

    /// Append one message. Non-blocking: a full ring is `ChannelFull`, an
    /// expected outcome the caller may retry (not counted as an error).
    pub fn send_bytes(&mut self, payload: &[u8]) -> Result<()> {
        let channel = self.channel.as_ref().ok_or(ChannelError::ChannelClosed)?;

        let max = channel.config().max_message_size;
        if payload.len() > max {
            self.stats.send_errors += 1;
            return Err(ChannelError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }

        match channel.ring().try_write(channel.header(), payload) {
            WriteOutcome::Written => {
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += payload.len() as u64;
                Ok(())
            }
            WriteOutcome::Full => Err(ChannelError::ChannelFull),
        }
    }

    /// Send any byte-stable value as a single message.
    pub fn send<T: IntoBytes + Immutable + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.send_bytes(value.as_bytes())
    }

    /// Convenience wrapper: true if the value was accepted.
    pub fn try_send<T: IntoBytes + Immutable + ?Sized>(&mut self, value: &T) -> bool {
        self.send(value).is_ok()
    }

    /// Current free byte count in the ring, zero when closed.
    pub fn available_space(&self) -> usize {
        match &self.channel {
            Some(channel) => channel.ring().available_write_space(channel.header()),
            None => 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Release the mapping. Subsequent sends return `ChannelClosed`.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(channel = %self.name, "sender closed");
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }
}
