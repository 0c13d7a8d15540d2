//! Header dump for a live swiftchannel region.
//!
//! Attach-only: inspecting a channel must never create or initialize one.

use anyhow::Context;
use swiftchannel::{Channel, ChannelConfig, ChannelFlags, ProtocolVersion, Role};

mod logging;

fn main() -> anyhow::Result<()> {
    logging::setup();

    let Some(name) = std::env::args().nth(1) else {
        eprintln!("Usage: swiftchannel-inspector <channel_name>");
        eprintln!();
        eprintln!("Prints the shared-region header of an active channel.");
        std::process::exit(1);
    };

    let config = ChannelConfig::default();
    let channel = Channel::attach(&name, &config, Role::Observer)
        .with_context(|| format!("failed to attach to channel `{name}`"))?;
    tracing::debug!(channel = %name, "attached for inspection");

    let header = channel.header();
    let ring_size = header.ring_size();
    let write_index = header.write_index();
    let read_index = header.read_index();
    let used = write_index.saturating_sub(read_index);
    let flags = ChannelFlags::from_bits_retain(header.flags());

    println!("channel:       {name}");
    println!("magic:         {:#010x}", header.magic());
    println!(
        "version:       {} ({:#010x})",
        ProtocolVersion::unpack(header.version()),
        header.version()
    );
    println!("ring size:     {ring_size} bytes");
    println!("write index:   {write_index}");
    println!("read index:    {read_index}");
    println!("used:          {used} bytes");
    println!("free:          {} bytes", ring_size.saturating_sub(used));
    println!("sender pid:    {}", format_pid(header.sender_pid()));
    println!("receiver pid:  {}", format_pid(header.receiver_pid()));
    println!("flags:         {flags:?}");

    Ok(())
}

fn format_pid(pid: u32) -> String {
    if pid == 0 {
        "(not attached)".to_string()
    } else {
        pid.to_string()
    }
}
