//! Classification of framed modem responses.
//!
//! The modem answers every command of the upload sequence with a line containing one of six
//! known keywords. A response is searched for the keywords in a fixed priority order, the first
//! hit decides the kind, and the kind decides which marker means success.

use core::fmt::Display;

/// Kinds of modem responses the node recognizes, in matching priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseKind {
    SimReady,
    NetworkRegistration,
    IpAddress,
    /// Unsolicited notice about the progress of an HTTP request.
    HttpResponseReady,
    /// Any other reply to an `AT*WHTTP` command.
    HttpStage,
    /// Time synchronization query, recognized but never acknowledged.
    TimeSync,
}

pub const RESPONSE_KINDS: [ResponseKind; 6] = [
    ResponseKind::SimReady,
    ResponseKind::NetworkRegistration,
    ResponseKind::IpAddress,
    ResponseKind::HttpResponseReady,
    ResponseKind::HttpStage,
    ResponseKind::TimeSync,
];

impl ResponseKind {
    pub fn keyword(&self) -> &'static [u8] {
        match self {
            ResponseKind::SimReady => b"+CPIN",
            ResponseKind::NetworkRegistration => b"+CEREG",
            ResponseKind::IpAddress => b"*WWANIP",
            ResponseKind::HttpResponseReady => b"*WHTTPR",
            ResponseKind::HttpStage => b"*WHTTP",
            ResponseKind::TimeSync => b"$$MSTIME?",
        }
    }

    /// Markers any of which make a response of this kind an acknowledgement.
    fn success_markers(&self) -> &'static [&'static [u8]] {
        match self {
            ResponseKind::SimReady => &[b"READY"],
            ResponseKind::NetworkRegistration => &[b"0,1"],
            ResponseKind::IpAddress => &[b"2001"],
            ResponseKind::HttpResponseReady => &[b"START", b"COMPLETED"],
            ResponseKind::HttpStage => &[b"OK"],
            ResponseKind::TimeSync => &[],
        }
    }

    /// Decides whether `message` acknowledges the current step.
    ///
    /// `None` means the kind carries no verdict and the pending ack must be left alone.
    pub fn verdict(&self, message: &[u8]) -> Option<bool> {
        match self {
            ResponseKind::TimeSync => None,
            kind => Some(kind.success_markers().iter().any(|marker| contains(message, marker))),
        }
    }
}

impl Display for ResponseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ResponseKind::SimReady => "SIM ready",
            ResponseKind::NetworkRegistration => "network registration",
            ResponseKind::IpAddress => "IP address",
            ResponseKind::HttpResponseReady => "HTTP response ready",
            ResponseKind::HttpStage => "HTTP stage",
            ResponseKind::TimeSync => "time sync",
        };
        f.write_str(name)
    }
}

/// Result of classifying one framed message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Classification {
    pub kind: Option<ResponseKind>,
    pub verdict: Option<bool>,
}

impl Classification {
    pub fn is_ack(&self) -> bool {
        self.verdict == Some(true)
    }
}

/// Classifies `message`, the first matching keyword wins.
///
/// An empty or unrecognized message yields a classification without a kind.
pub fn classify(message: &[u8]) -> Classification {
    RESPONSE_KINDS
        .iter()
        .find(|kind| contains(message, kind.keyword()))
        .map(|kind| Classification {
            kind: Some(*kind),
            verdict: kind.verdict(message),
        })
        .unwrap_or_default()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}
