//! Equatorial reference frames of WCS solutions.
//!
//! The `wcs` crate reports equatorial positions unchanged and identifies
//! FK5 at J2000 with ICRS. It carries no precession or FK4 model, so only
//! those two frames can be written out as ICRS.

use std::fmt;

use crate::error::{Error, Result};

/// Native equatorial frame of a WCS solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CelestialFrame {
    /// International Celestial Reference System
    Icrs,
    /// FK5 at the given Julian equinox
    Fk5 {
        /// Equinox as a Julian epoch (e.g. 2000.0)
        equinox: f64,
    },
    /// FK4 at the given Besselian equinox
    Fk4 {
        /// Equinox as a Besselian epoch (e.g. 1950.0)
        equinox: f64,
    },
}

impl fmt::Display for CelestialFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CelestialFrame::Icrs => write!(f, "ICRS"),
            CelestialFrame::Fk5 { equinox } => write!(f, "FK5(J{})", equinox),
            CelestialFrame::Fk4 { equinox } => write!(f, "FK4(B{})", equinox),
        }
    }
}

impl CelestialFrame {
    /// Resolve the frame from the `RADESYS` and `EQUINOX` header values.
    ///
    /// Without `RADESYS`, an equinox before 1984 means FK4, any other
    /// equinox FK5, and no equinox at all ICRS.
    pub fn from_header(radesys: Option<&str>, equinox: Option<f64>) -> Result<Self> {
        let system = radesys.map(|s| s.trim().to_ascii_uppercase());
        match system.as_deref() {
            Some("ICRS") => Ok(CelestialFrame::Icrs),
            Some("FK5") => Ok(CelestialFrame::Fk5 {
                equinox: equinox.unwrap_or(2000.0),
            }),
            Some("FK4") | Some("FK4-NO-E") => Ok(CelestialFrame::Fk4 {
                equinox: equinox.unwrap_or(1950.0),
            }),
            Some(other) => Err(Error::Frame {
                message: format!("unsupported RADESYS '{}'", other),
            }),
            None => Ok(match equinox {
                Some(e) if e < 1984.0 => CelestialFrame::Fk4 { equinox: e },
                Some(e) => CelestialFrame::Fk5 { equinox: e },
                None => CelestialFrame::Icrs,
            }),
        }
    }

    /// Check that positions in this frame may be reported as ICRS.
    pub fn check_icrs_reframing(&self) -> Result<()> {
        match *self {
            CelestialFrame::Icrs => Ok(()),
            CelestialFrame::Fk5 { equinox } if equinox == 2000.0 => Ok(()),
            _ => Err(Error::Frame {
                message: format!("reframing {} to ICRS is not supported", self),
            }),
        }
    }
}
