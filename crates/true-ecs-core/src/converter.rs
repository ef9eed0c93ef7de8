//! Pixel-to-sky conversion
//!
//! Applies a WCS solution to every row of a pixel table, optionally
//! reframing the result to ICRS. Pure: no I/O happens here.

use crate::error::Result;
use crate::frames::CelestialFrame;
use crate::table::{PixelTable, SkyTable};
use crate::wcs::WcsSolution;

/// Convert a pixel table to sky coordinates.
///
/// Rows keep their order. Without `transform_to_icrs` the coordinates are
/// in the native frame of `wcs`.
pub fn pixel_to_sky(
    wcs: &WcsSolution,
    pixels: &PixelTable,
    transform_to_icrs: bool,
) -> Result<SkyTable> {
    let frame = if transform_to_icrs {
        wcs.frame.check_icrs_reframing()?;
        CelestialFrame::Icrs
    } else {
        wcs.frame
    };

    let mut sky = SkyTable {
        frame,
        ra: Vec::with_capacity(pixels.len()),
        dec: Vec::with_capacity(pixels.len()),
    };
    for (x, y) in pixels.positions() {
        let (ra, dec) = wcs.pixel_to_world(x, y)?;
        sky.ra.push(ra);
        sky.dec.push(dec);
    }
    Ok(sky)
}
