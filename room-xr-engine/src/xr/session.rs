use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::XrError;

/// Immersive session flavour chosen by the user's start gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XrMode {
    Ar,
    Vr,
}

impl XrMode {
    /// Parse the identifier used by the host page ("ar" / "vr").
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ar" => Some(Self::Ar),
            "vr" => Some(Self::Vr),
            _ => None,
        }
    }
}

impl fmt::Display for XrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ar => f.write_str("AR"),
            Self::Vr => f.write_str("VR"),
        }
    }
}

/// What the host reported about WebXR on this device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrCapabilities {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub ar_available: bool,
    #[serde(default)]
    pub vr_available: bool,
    #[serde(default)]
    pub hit_test_supported: bool,
}

impl XrCapabilities {
    /// Check that a session of `mode` can be requested on this device.
    /// AR placement needs hit testing, VR intersects the floor plane itself.
    pub fn check(&self, mode: XrMode) -> Result<(), XrError> {
        if !self.supported {
            return Err(XrError::Unsupported);
        }
        match mode {
            XrMode::Ar if !self.ar_available => Err(XrError::ModeUnavailable(mode)),
            XrMode::Ar if !self.hit_test_supported => Err(XrError::HitTestUnsupported),
            XrMode::Vr if !self.vr_available => Err(XrError::ModeUnavailable(mode)),
            _ => Ok(()),
        }
    }
}

/// Live view of the host XR session.
#[derive(Resource, Debug, Default)]
pub struct XrSession {
    pub capabilities: XrCapabilities,
    /// Mode requested by the start gesture, kept after the session ends.
    pub mode: Option<XrMode>,
    pub active: bool,
    pub hit_test_available: bool,
    /// Why the degraded view is showing, if it is.
    pub unavailable: Option<XrError>,
}

impl XrSession {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_mode(&self, mode: XrMode) -> bool {
        self.mode == Some(mode)
    }
}

/// Session lifecycle notifications coming from the host runtime.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum XrSessionEvent {
    Capabilities(XrCapabilities),
    /// User gesture picked a mode on the start screen.
    StartRequested(XrMode),
    Started(XrMode),
    StartFailed(String),
    Ended,
    /// The host can now create hit-test sources (AR only).
    HitTestAvailable,
}

/// Raised once the viewer has switched to its degraded, non-XR view.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct XrUnavailableEvent {
    pub mode: Option<XrMode>,
    pub reason: XrError,
}

/// Request a session after checking capabilities; on failure return the
/// reason the unavailable indicator should show.
pub fn request_session(session: &mut XrSession, mode: XrMode) -> Result<(), XrError> {
    session.mode = Some(mode);
    match session.capabilities.check(mode) {
        Ok(()) => {
            session.unavailable = None;
            Ok(())
        }
        Err(err) => {
            session.unavailable = Some(err.clone());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities() -> XrCapabilities {
        XrCapabilities {
            supported: true,
            ar_available: true,
            vr_available: true,
            hit_test_supported: true,
        }
    }

    #[test]
    fn ar_without_hit_test_is_reported() {
        let caps = XrCapabilities {
            hit_test_supported: false,
            ..capabilities()
        };
        assert_eq!(caps.check(XrMode::Ar), Err(XrError::HitTestUnsupported));
        assert_eq!(caps.check(XrMode::Vr), Ok(()));
    }

    #[test]
    fn unsupported_webxr_wins_over_mode_checks() {
        let caps = XrCapabilities::default();
        assert_eq!(caps.check(XrMode::Vr), Err(XrError::Unsupported));
    }

    #[test]
    fn failed_request_records_reason() {
        let mut session = XrSession {
            capabilities: XrCapabilities {
                vr_available: false,
                ..capabilities()
            },
            ..default()
        };
        let err = request_session(&mut session, XrMode::Vr).unwrap_err();
        assert_eq!(err, XrError::ModeUnavailable(XrMode::Vr));
        assert_eq!(session.unavailable, Some(err));
        assert!(session.is_mode(XrMode::Vr));

        session.capabilities.vr_available = true;
        assert!(request_session(&mut session, XrMode::Vr).is_ok());
        assert_eq!(session.unavailable, None);
    }

    #[test]
    fn mode_parses_host_identifiers() {
        assert_eq!(XrMode::from_string("AR"), Some(XrMode::Ar));
        assert_eq!(XrMode::from_string("vr"), Some(XrMode::Vr));
        assert_eq!(XrMode::from_string("inline"), None);
    }
}
