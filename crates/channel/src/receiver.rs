//! Consumer endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, trace};

use crate::channel::Channel;
use crate::config::ChannelConfig;
use crate::errors::{ChannelError, Result};
use crate::handshake::Role;
use crate::ring::ReadOutcome;

/// Outcome of a non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A message of this many bytes was copied into the destination.
    Received(usize),
    /// No message is pending.
    Empty,
    /// The destination is smaller than the pending message, which stays in
    /// the ring; retry with at least `required` bytes.
    Undersized { required: usize },
}

/// Endpoint-local receive counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverStats {
    pub messages_received: u64,
    pub bytes_received: u64,
    pub errors: u64,
    /// Times the internal scratch buffer had to grow past
    /// `max_message_size` because the peer was configured larger.
    pub undersized_reads: u64,
}

/// Requests a running [`Receiver::run`] loop to stop after its current poll.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The reading end of a channel.
#[derive(Debug)]
pub struct Receiver {
    name: String,
    config: ChannelConfig,
    channel: Option<Channel>,
    scratch: Vec<u8>,
    running: Arc<AtomicBool>,
    stats: ReceiverStats,
}

impl Receiver {
    /// Create-or-open: a receiver may start before any sender exists.
    pub fn connect(name: &str, config: ChannelConfig) -> Result<Self> {
        let channel = Channel::open(name, &config, Role::Receiver)?;
        Ok(Self::from_channel(name, config, channel))
    }

    /// Attach-only: fails with `ChannelNotFound` until a peer creates the
    /// channel.
    pub fn attach(name: &str, config: ChannelConfig) -> Result<Self> {
        let channel = Channel::attach(name, &config, Role::Receiver)?;
        Ok(Self::from_channel(name, config, channel))
    }

    fn from_channel(name: &str, config: ChannelConfig, channel: Channel) -> Self {
        debug!(channel = name, "receiver connected");
        let scratch = vec![0u8; config.max_message_size];
        Self {
            name: name.to_string(),
            config,
            channel: Some(channel),
            scratch,
            running: Arc::new(AtomicBool::new(false)),
            stats: ReceiverStats::default(),
        }
    }

    /// Copy the next pending message into `dst`, if any.
    ///
    /// `MessageCorrupted` is fatal: the cursor is not advanced, so the
    /// failure repeats until the channel is torn down.
    pub fn try_read(&mut self, dst: &mut [u8]) -> Result<ReadStatus> {
        let channel = self.channel.as_ref().ok_or(ChannelError::ChannelClosed)?;

        match channel.ring().try_read(channel.header(), dst) {
            ReadOutcome::Read(n) => {
                self.stats.messages_received += 1;
                self.stats.bytes_received += n as u64;
                Ok(ReadStatus::Received(n))
            }
            ReadOutcome::Empty => Ok(ReadStatus::Empty),
            ReadOutcome::Undersized { required } => Ok(ReadStatus::Undersized { required }),
            ReadOutcome::Corrupted => {
                self.stats.errors += 1;
                error!(channel = %self.name, "frame magic mismatch; stream is poisoned");
                Err(ChannelError::MessageCorrupted)
            }
        }
    }

    /// Poll for one message and hand it to `callback`. Returns whether a
    /// message was delivered.
    ///
    /// The view passed to the callback is only valid for the duration of
    /// the call. If the peer was configured with a larger maximum message
    /// size, the internal buffer grows to match and the read is retried.
    pub fn poll_one<F>(&mut self, mut callback: F) -> Result<bool>
    where
        F: FnMut(&[u8]),
    {
        let channel = self.channel.as_ref().ok_or(ChannelError::ChannelClosed)?;

        loop {
            match channel.ring().try_read(channel.header(), &mut self.scratch) {
                ReadOutcome::Read(n) => {
                    self.stats.messages_received += 1;
                    self.stats.bytes_received += n as u64;
                    callback(&self.scratch[..n]);
                    return Ok(true);
                }
                ReadOutcome::Empty => return Ok(false),
                ReadOutcome::Undersized { required } => {
                    self.stats.undersized_reads += 1;
                    trace!(required, "growing receive buffer for oversized peer frame");
                    self.scratch.resize(required, 0);
                }
                ReadOutcome::Corrupted => {
                    self.stats.errors += 1;
                    error!(channel = %self.name, "frame magic mismatch; stream is poisoned");
                    return Err(ChannelError::MessageCorrupted);
                }
            }
        }
    }

    /// Blocking poll loop with a yielding backoff. Runs until a
    /// [`StopHandle`] fires or an error poisons the stream. This is a
    /// convenience wrapper; the protocol itself never blocks.
    pub fn run<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]),
    {
        self.running.store(true, Ordering::Release);
        while self.running.load(Ordering::Acquire) {
            if !self.poll_one(&mut callback)? {
                thread::yield_now();
            }
        }
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Release the mapping. Subsequent reads return `ChannelClosed`.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!(channel = %self.name, "receiver closed");
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }
}
