//! Address-based routing of inbound OSC messages to commands.
//!
//! Incoming addresses may be OSC 1.0 address patterns (`*`, `?`, `[a-z]`,
//! `{a,b}`). A pattern runs the commands of every mapped address it matches.

use crate::config::{ConfigStore, OscConfig};
use crate::osc::codec;
use crate::tracker::TrackerControl;

use std::collections::BTreeMap;
use std::net::SocketAddr;

use log::{debug, info, trace, warn};
use rosc::address::{Matcher, OscAddress};

const PATTERN_CHARS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// What an inbound message asks the backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OscCommand {
    Recalibrate,
    Recenter,
    ToggleSyncBlink,
}

/// Table from OSC address to commands.
///
/// An address may map to several commands; they run in registration order.
/// A pattern matching several addresses runs them in address order.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    routes: BTreeMap<String, Vec<OscCommand>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table built from the command addresses currently configured.
    pub fn from_config(osc: &OscConfig) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.map(&osc.recalibrate_address, OscCommand::Recalibrate);
        dispatcher.map(&osc.recenter_address, OscCommand::Recenter);
        dispatcher.map(&osc.sync_blink_address, OscCommand::ToggleSyncBlink);
        dispatcher
    }

    pub fn map(&mut self, address: impl Into<String>, command: OscCommand) {
        self.routes.entry(address.into()).or_default().push(command);
    }

    /// Commands for an incoming address or address pattern.
    pub fn route(&self, address: &str) -> Vec<OscCommand> {
        if let Some(commands) = self.routes.get(address) {
            return commands.clone();
        }

        if !address.contains(PATTERN_CHARS) {
            return Vec::new();
        }

        let matcher = match Matcher::new(address) {
            Ok(matcher) => matcher,
            Err(e) => {
                debug!("Ignoring invalid OSC address pattern {address}: {e:?}");
                return Vec::new();
            }
        };

        self.routes
            .iter()
            .filter(|(mapped, _)| {
                OscAddress::new((*mapped).clone())
                    .is_ok_and(|mapped| matcher.match_address(&mapped))
            })
            .flat_map(|(_, commands)| commands.iter().copied())
            .collect()
    }

    /// Decode `datagram` and run every mapped command.
    ///
    /// Never fails: malformed packets, unmapped addresses and failing
    /// commands are logged and skipped. Returns how many commands ran.
    pub async fn dispatch(
        &self,
        datagram: &[u8],
        peer: SocketAddr,
        store: &ConfigStore,
        tracker: &dyn TrackerControl,
    ) -> usize {
        let messages = match codec::decode(datagram) {
            Ok(messages) => messages,
            Err(e) => {
                debug!("Ignoring malformed OSC packet from {peer}: {e}");
                return 0;
            }
        };

        let mut handled = 0;
        for message in messages {
            let commands = self.route(&message.addr);
            if commands.is_empty() {
                trace!("No handler for OSC address {} from {peer}", message.addr);
                continue;
            }

            for command in commands {
                execute(command, store, tracker).await;
                handled += 1;
            }
        }
        handled
    }
}

// Payloads are ignored; the toggle flips the stored value.
async fn execute(command: OscCommand, store: &ConfigStore, tracker: &dyn TrackerControl) {
    match command {
        OscCommand::Recalibrate => {
            if let Err(e) = tracker.recalibrate() {
                warn!("Recalibration request failed: {e}");
            }
        }
        OscCommand::Recenter => {
            if let Err(e) = tracker.recenter() {
                warn!("Recenter request failed: {e}");
            }
        }
        OscCommand::ToggleSyncBlink => {
            let sync_blink = store.toggle_sync_blink().await;
            info!("sync_blink toggled to {sync_blink}");
        }
    }
}
