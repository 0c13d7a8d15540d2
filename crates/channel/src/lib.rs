//! Bounded, lock-free, single-producer single-consumer message channel over
//! a named shared-memory region.
//!
//! One process connects a [`Sender`], another a [`Receiver`], both under the
//! same channel name. Whichever attaches first creates and initializes the
//! region; the other validates it. Messages are framed into a circular byte
//! buffer and published with a single release store per message; a full
//! buffer rejects writes, and accepted messages arrive intact and in order.
//!
//! ```no_run
//! use swiftchannel::{ChannelConfig, Receiver, Sender};
//!
//! # fn main() -> swiftchannel::Result<()> {
//! let config = ChannelConfig::default();
//! let mut sender = Sender::connect("telemetry", config.clone())?;
//! sender.send_bytes(b"reading: 42")?;
//!
//! let mut receiver = Receiver::connect("telemetry", config)?;
//! receiver.poll_one(|message| {
//!     println!("got {} bytes", message.len());
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod errors;
pub mod layout;
pub mod receiver;
pub mod ring;
pub mod sender;
pub mod shm;

mod handshake;
mod names;

pub use channel::Channel;
pub use config::{ChannelConfig, ChannelFlags};
pub use errors::{ChannelError, Result};
pub use handshake::Role;
pub use layout::{FrameHeader, ProtocolVersion, RegionHeader};
pub use receiver::{ReadStatus, Receiver, ReceiverStats, StopHandle};
pub use ring::{ReadOutcome, RingBuffer, WriteOutcome};
pub use sender::{Sender, SenderStats};
pub use shm::{OpenMode, SharedMemory};
