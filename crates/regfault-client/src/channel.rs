//! Channel URI parsing and validation.
//!
//! Format: `aeron:<media>[?key=value[|key=value]...]`, where media is `udp`
//! or `ipc`. A `udp` channel needs an `endpoint` or a `control` parameter.

use std::collections::BTreeMap;
use std::fmt;

use regfault_core::{RegistrationFault, RegistrationResult};

const PREFIX: &str = "aeron:";

/// Transport media named by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Media {
    Udp,
    Ipc,
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => write!(f, "udp"),
            Self::Ipc => write!(f, "ipc"),
        }
    }
}

/// A validated channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUri {
    media: Media,
    params: BTreeMap<String, String>,
}

impl ChannelUri {
    /// Parse and validate `channel`.
    ///
    /// Every failure is an `INVALID_CHANNEL` fault whose message quotes the
    /// offending channel string.
    pub fn parse(channel: &str) -> RegistrationResult<Self> {
        let invalid =
            |reason: &str| RegistrationFault::invalid_channel(format!("{reason}: '{channel}'"));

        let rest = channel
            .strip_prefix(PREFIX)
            .ok_or_else(|| invalid("channel does not start with 'aeron:'"))?;

        let (media_str, query) = match rest.split_once('?') {
            Some((m, q)) => (m, Some(q)),
            None => (rest, None),
        };

        let media = match media_str {
            "udp" => Media::Udp,
            "ipc" => Media::Ipc,
            "" => return Err(invalid("channel has no media")),
            other => return Err(invalid(format!("unsupported media '{other}'").as_str())),
        };

        let mut params = BTreeMap::new();
        if let Some(query) = query {
            for pair in query.split('|') {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| invalid(format!("parameter '{pair}' has no value").as_str()))?;
                if key.is_empty() {
                    return Err(invalid("parameter with empty key"));
                }
                params.insert(key.to_string(), value.to_string());
            }
        }

        let uri = Self { media, params };
        if media == Media::Udp {
            uri.validate_udp().map_err(|reason| invalid(reason.as_str()))?;
        }
        Ok(uri)
    }

    fn validate_udp(&self) -> Result<(), String> {
        let endpoint = self.param("endpoint");
        let control = self.param("control");
        if endpoint.is_none() && control.is_none() {
            return Err("udp channel needs an 'endpoint' or 'control' parameter".into());
        }
        for (key, addr) in [("endpoint", endpoint), ("control", control)] {
            if let Some(addr) = addr {
                check_host_port(addr).map_err(|e| format!("{key} {e}"))?;
            }
        }
        Ok(())
    }

    pub fn media(&self) -> Media {
        self.media
    }

    /// Look up a parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

fn check_host_port(addr: &str) -> Result<(), String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("'{addr}' is not host:port"))?;
    if host.is_empty() {
        return Err(format!("'{addr}' has no host"));
    }
    port.parse::<u16>()
        .map_err(|_| format!("'{addr}' has an invalid port"))?;
    Ok(())
}

impl fmt::Display for ChannelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.media)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '|' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
