//! Channel-name normalization.
//!
//! Callers address channels by a plain UTF-8 name. The OS-level object name
//! is derived by prefixing, which keeps unrelated shared-memory users out of
//! our namespace and keeps the POSIX "must start with `/`, no further
//! slashes" rule satisfied in one place.

use crate::errors::{ChannelError, Result};

#[cfg(unix)]
pub(crate) const OS_PREFIX: &str = "/swiftchannel_";
#[cfg(windows)]
pub(crate) const OS_PREFIX: &str = r"Local\SwiftChannel_";

/// Upper bound on the prefixed OS name, in bytes.
const MAX_OS_NAME_BYTES: usize = 240;

/// Map a channel name to its OS object name, validating as we go.
pub(crate) fn os_name(channel: &str) -> Result<String> {
    if channel.is_empty() {
        return Err(ChannelError::InvalidOperation(
            "channel name must not be empty",
        ));
    }
    if channel.contains(['/', '\\', '\0']) {
        return Err(ChannelError::InvalidOperation(
            "channel name must not contain path separators or NUL",
        ));
    }

    let name = format!("{OS_PREFIX}{channel}");
    if name.len() > MAX_OS_NAME_BYTES {
        return Err(ChannelError::InvalidOperation("channel name too long"));
    }
    Ok(name)
}
