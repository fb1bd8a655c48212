//! Playback sink strategies.
//!
//! The core only ever sees `dyn PlaybackSink`. Two strategies adapt the
//! external delivery mechanisms:
//! - [`MediaKeySink`]: a platform play/pause toggle
//! - [`TabScriptSink`]: scripted control of an allow-listed browser tab

use std::sync::Arc;
use tracing::debug;

use crate::config::DispatchStrategy;
use crate::dispatcher::PlaybackCommand;
use crate::error::DispatchError;

/// Fire-and-forget destination for playback commands.
pub trait PlaybackSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver(&self, command: PlaybackCommand) -> Result<(), DispatchError>;
}

/// Posts the platform media play/pause key.
pub trait MediaKeyPoster: Send + Sync {
    fn send_play_pause(&self) -> Result<(), DispatchError>;
}

/// Injects a play/pause action into the active tab whose address matches
/// the allow-list. Returns diagnostic text on success.
pub trait TabScripter: Send + Sync {
    fn control_tab(
        &self,
        command: PlaybackCommand,
        domain_allowlist: &[String],
    ) -> Result<String, DispatchError>;
}

/// Media-key strategy. Both commands map to the single toggle.
pub struct MediaKeySink<P> {
    poster: P,
}

impl<P: MediaKeyPoster> MediaKeySink<P> {
    pub fn new(poster: P) -> Self {
        Self { poster }
    }
}

impl<P: MediaKeyPoster> PlaybackSink for MediaKeySink<P> {
    fn name(&self) -> &'static str {
        "media_key"
    }

    fn deliver(&self, _command: PlaybackCommand) -> Result<(), DispatchError> {
        self.poster.send_play_pause()
    }
}

/// Tab-script strategy.
pub struct TabScriptSink<T> {
    scripter: T,
    domain_allowlist: Vec<String>,
}

impl<T: TabScripter> TabScriptSink<T> {
    pub fn new(scripter: T, domain_allowlist: Vec<String>) -> Self {
        Self {
            scripter,
            domain_allowlist,
        }
    }

    pub fn domain_allowlist(&self) -> &[String] {
        &self.domain_allowlist
    }
}

impl<T: TabScripter> PlaybackSink for TabScriptSink<T> {
    fn name(&self) -> &'static str {
        "tab_script"
    }

    fn deliver(&self, command: PlaybackCommand) -> Result<(), DispatchError> {
        let diagnostic = self.scripter.control_tab(command, &self.domain_allowlist)?;
        debug!(%command, %diagnostic, "tab script delivered");
        Ok(())
    }
}

/// Select the configured strategy.
pub fn build_sink<P, T>(
    strategy: DispatchStrategy,
    domain_allowlist: &[String],
    poster: P,
    scripter: T,
) -> Arc<dyn PlaybackSink>
where
    P: MediaKeyPoster + 'static,
    T: TabScripter + 'static,
{
    match strategy {
        DispatchStrategy::MediaKey => Arc::new(MediaKeySink::new(poster)),
        DispatchStrategy::TabScript => {
            Arc::new(TabScriptSink::new(scripter, domain_allowlist.to_vec()))
        }
    }
}

/// Lower-cased host of an address. Scheme, userinfo, port, path, query and
/// fragment are ignored.
pub fn host_of(address: &str) -> Option<String> {
    let rest = address
        .split_once("://")
        .map(|(_, r)| r)
        .unwrap_or(address);
    let authority = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

/// True if the address's host equals an allow-listed domain or is a
/// subdomain of one.
pub fn host_matches_allowlist(address: &str, allowlist: &[String]) -> bool {
    let Some(host) = host_of(address) else {
        return false;
    };
    allowlist.iter().any(|entry| {
        let domain = entry.trim().trim_start_matches("*.").to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .map(|prefix| prefix.ends_with('.'))
                    .unwrap_or(false))
    })
}
