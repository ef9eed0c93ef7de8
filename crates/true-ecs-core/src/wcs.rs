//! WCS calibration files and the pixel-to-world mapping.
//!
//! The projection itself, SIP distortion included, is evaluated by the
//! `wcs` crate. This module turns a FITS primary header into its
//! parameters, fills in the image size that astrometry.net stores as
//! `IMAGEW`/`IMAGEH` on a data-less header, and resolves the native frame.

use std::path::Path;

use fitrs::{Fits, HeaderValue};
use serde_json::{Map, Number, Value};
use ::wcs::{ImgXY, WCS, WCSParams};

use crate::error::{Error, Result};
use crate::frames::CelestialFrame;

/// Header cards by keyword, as consumed by [`WcsSolution::from_header`].
pub type Header = Map<String, Value>;

/// A calibrated WCS solution for one image.
#[derive(Debug)]
pub struct WcsSolution {
    projection: WCS,
    /// Native reference frame of the solution.
    pub frame: CelestialFrame,
}

impl WcsSolution {
    /// Undistorted TAN solution for an image of `size` pixels.
    pub fn tan(
        size: [u32; 2],
        crpix: [f64; 2],
        crval: [f64; 2],
        cd: [[f64; 2]; 2],
        frame: CelestialFrame,
    ) -> Result<Self> {
        let mut header = Header::new();
        header.insert("CTYPE1".into(), "RA---TAN".into());
        header.insert("CTYPE2".into(), "DEC--TAN".into());

        let (radesys, equinox) = match frame {
            CelestialFrame::Icrs => ("ICRS", None),
            CelestialFrame::Fk5 { equinox } => ("FK5", Some(equinox)),
            CelestialFrame::Fk4 { equinox } => ("FK4", Some(equinox)),
        };
        header.insert("RADESYS".into(), radesys.into());
        if let Some(equinox) = equinox {
            header.insert("EQUINOX".into(), equinox.into());
        }

        let numbers = [
            ("NAXIS1", f64::from(size[0])),
            ("NAXIS2", f64::from(size[1])),
            ("CRPIX1", crpix[0]),
            ("CRPIX2", crpix[1]),
            ("CRVAL1", crval[0]),
            ("CRVAL2", crval[1]),
            ("CD1_1", cd[0][0]),
            ("CD1_2", cd[0][1]),
            ("CD2_1", cd[1][0]),
            ("CD2_2", cd[1][1]),
        ];
        for (key, value) in numbers {
            header.insert(key.into(), value.into());
        }

        Self::from_header(header)
    }

    /// Read the WCS solution from the primary header of a FITS file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fits = Fits::open(path)?;
        let hdu = fits
            .get(0)
            .ok_or_else(|| Error::wcs(format!("{} has no primary header", path.display())))?;

        let header: Header = hdu
            .iter()
            .filter_map(|(key, value)| Some((key.trim().to_string(), json_value(value?)?)))
            .collect();
        Self::from_header(header)
    }

    /// Build the solution from header cards.
    ///
    /// Only equatorial `RA--`/`DEC-` axes are accepted. Distortion is
    /// applied when `CTYPE1` carries the `-SIP` suffix and ignored otherwise,
    /// even if `A_ORDER` and friends are present.
    pub fn from_header(mut header: Header) -> Result<Self> {
        for (key, value) in header.iter_mut() {
            if let Value::String(s) = value {
                *s = s.trim().to_string();
            } else if is_integer_keyword(key)
                && let Some(n) = value.as_f64().filter(|n| n.fract() == 0.0)
            {
                *value = Value::from(n as i64);
            }
        }

        check_axis(&header, "CTYPE1", "RA--")?;
        check_axis(&header, "CTYPE2", "DEC-")?;
        for key in ["CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2"] {
            number(&header, key).ok_or_else(|| Error::wcs(format!("missing keyword {}", key)))?;
        }

        let radesys = text(&header, "RADESYS").or_else(|| text(&header, "RADECSYS"));
        let equinox = number(&header, "EQUINOX").or_else(|| number(&header, "EPOCH"));
        let frame = CelestialFrame::from_header(radesys, equinox)?;

        // header-only files carry NAXIS = 0
        for (axis, fallback) in [("NAXIS1", "IMAGEW"), ("NAXIS2", "IMAGEH")] {
            if !header.contains_key(axis) {
                let size = header.get(fallback).cloned().ok_or_else(|| {
                    Error::wcs(format!("missing image size ({} or {})", axis, fallback))
                })?;
                header.insert(axis.to_string(), size);
            }
        }
        header.insert("NAXIS".into(), Value::from(2));

        let params: WCSParams = serde_json::from_value(Value::Object(header))
            .map_err(|e| Error::wcs(format!("invalid WCS header: {}", e)))?;
        let projection = WCS::new(&params).map_err(|e| Error::wcs(e.to_string()))?;

        Ok(Self { projection, frame })
    }

    /// Image width and height in pixels.
    pub fn image_size(&self) -> [i64; 2] {
        let dims = self.projection.img_dimensions();
        [dims[0], dims[1]]
    }

    /// Map a 0-based pixel position to (RA, Dec) in degrees, in the native frame.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        // FITS pixel centres are 1-based
        let lonlat = self
            .projection
            .unproj(&ImgXY::new(x + 1.0, y + 1.0))
            .ok_or_else(|| Error::wcs(format!("pixel ({}, {}) is outside the projection", x, y)))?;
        Ok((
            lonlat.lon().to_degrees().rem_euclid(360.0),
            lonlat.lat().to_degrees(),
        ))
    }
}

fn json_value(value: &HeaderValue) -> Option<Value> {
    match value {
        HeaderValue::CharacterString(s) => Some(Value::from(s.as_str())),
        HeaderValue::Logical(b) => Some(Value::from(*b)),
        HeaderValue::IntegerNumber(n) => Some(Value::from(*n)),
        HeaderValue::RealFloatingNumber(x) => Number::from_f64(*x).map(Value::Number),
        _ => None,
    }
}

/// Keywords the WCS library reads as integers.
fn is_integer_keyword(key: &str) -> bool {
    key.starts_with("NAXIS") || key.starts_with("ZNAXIS") || key.ends_with("_ORDER")
}

fn text<'a>(header: &'a Header, key: &str) -> Option<&'a str> {
    header.get(key).and_then(Value::as_str)
}

fn number(header: &Header, key: &str) -> Option<f64> {
    header.get(key).and_then(Value::as_f64)
}

/// `RA---TAN-SIP` style axis type: 4-character axis, then the projection code.
fn check_axis(header: &Header, key: &str, axis: &str) -> Result<()> {
    let ctype = text(header, key).unwrap_or_default();
    if ctype.starts_with(axis) && ctype.len() >= 8 {
        Ok(())
    } else {
        Err(Error::wcs(format!("unsupported axis type {} = '{}'", key, ctype)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ARCSEC_DEG: f64 = 1.0 / 3600.0;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() < tol,
            "expected {a} ~= {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn header(value: Value) -> Header {
        match value {
            Value::Object(map) => map,
            other => panic!("not a header: {other}"),
        }
    }

    /// What astrometry.net writes to `wcs_file`: no data, size in IMAGEW/IMAGEH.
    fn astrometry_header() -> Header {
        header(json!({
            "SIMPLE": true,
            "NAXIS": 0,
            "CTYPE1": "RA---TAN-SIP",
            "CTYPE2": "DEC--TAN-SIP",
            "EQUINOX": 2000.0,
            "IMAGEW": 1024,
            "IMAGEH": 768,
            "CRPIX1": 512.5,
            "CRPIX2": 384.5,
            "CRVAL1": 83.822,
            "CRVAL2": -5.391,
            "CD1_1": -ARCSEC_DEG,
            "CD1_2": 0.0,
            "CD2_1": 0.0,
            "CD2_2": ARCSEC_DEG,
            "A_ORDER": 2,
            "A_2_0": 1e-6,
            "B_ORDER": 2,
            "B_0_2": -1e-6,
        }))
    }

    fn without_sip_suffix(mut header: Header) -> Header {
        header.insert("CTYPE1".into(), "RA---TAN".into());
        header.insert("CTYPE2".into(), "DEC--TAN".into());
        header
    }

    #[test]
    fn test_parse_astrometry_header() {
        let wcs = WcsSolution::from_header(astrometry_header()).unwrap();
        assert_eq!(wcs.frame, CelestialFrame::Fk5 { equinox: 2000.0 });
        assert_eq!(wcs.image_size(), [1024, 768]);
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = WcsSolution::tan(
            [200, 400],
            [100.0, 200.0],
            [150.0, 30.0],
            [[-ARCSEC_DEG, 0.0], [0.0, ARCSEC_DEG]],
            CelestialFrame::Icrs,
        )
        .unwrap();
        // 0-based pixel of CRPIX
        let (ra, dec) = wcs.pixel_to_world(99.0, 199.0).unwrap();
        assert_close(ra, 150.0, 1e-9);
        assert_close(dec, 30.0, 1e-9);
    }

    #[test]
    fn test_axis_directions() {
        let wcs = WcsSolution::tan(
            [100, 100],
            [1.0, 1.0],
            [10.0, 0.0],
            [[-ARCSEC_DEG, 0.0], [0.0, ARCSEC_DEG]],
            CelestialFrame::Icrs,
        )
        .unwrap();
        // +x is west (RA decreases) with a negative CD1_1; +y is north
        let (ra, dec) = wcs.pixel_to_world(10.0, 0.0).unwrap();
        assert_close(ra, 10.0 - 10.0 * ARCSEC_DEG, 1e-9);
        assert_close(dec, 0.0, 1e-9);

        let (ra, dec) = wcs.pixel_to_world(0.0, 10.0).unwrap();
        assert_close(ra, 10.0, 1e-9);
        assert_close(dec, 10.0 * ARCSEC_DEG, 1e-9);
    }

    #[test]
    fn test_ra_wraps_into_range() {
        let wcs = WcsSolution::tan(
            [100, 100],
            [1.0, 1.0],
            [0.0, 0.0],
            [[-ARCSEC_DEG, 0.0], [0.0, ARCSEC_DEG]],
            CelestialFrame::Icrs,
        )
        .unwrap();
        let (ra, _) = wcs.pixel_to_world(10.0, 0.0).unwrap();
        assert!((0.0..360.0).contains(&ra));
        assert_close(ra, 360.0 - 10.0 * ARCSEC_DEG, 1e-9);
    }

    #[test]
    fn test_sip_shifts_positions() {
        let with_sip = WcsSolution::from_header(astrometry_header()).unwrap();
        let without_sip = WcsSolution::from_header(without_sip_suffix(astrometry_header())).unwrap();

        let a = with_sip.pixel_to_world(1000.0, 700.0).unwrap();
        let b = without_sip.pixel_to_world(1000.0, 700.0).unwrap();
        assert!((a.0 - b.0).abs() > 1e-6);

        // no distortion at the reference pixel
        let a = with_sip.pixel_to_world(511.5, 383.5).unwrap();
        let b = without_sip.pixel_to_world(511.5, 383.5).unwrap();
        assert_close(a.0, b.0, 1e-12);
        assert_close(a.1, b.1, 1e-12);
    }

    #[test]
    fn test_sip_coefficients_ignored_without_suffix() {
        let mut plain = without_sip_suffix(astrometry_header());
        for key in ["A_ORDER", "A_2_0", "B_ORDER", "B_0_2"] {
            plain.remove(key);
        }
        let plain = WcsSolution::from_header(plain).unwrap();
        let stray = WcsSolution::from_header(without_sip_suffix(astrometry_header())).unwrap();

        assert_eq!(
            plain.pixel_to_world(1000.0, 700.0).unwrap(),
            stray.pixel_to_world(1000.0, 700.0).unwrap()
        );
    }

    #[test]
    fn test_pc_cdelt_equivalent_to_cd() {
        let pc = WcsSolution::from_header(header(json!({
            "CTYPE1": "RA---TAN",
            "CTYPE2": "DEC--TAN",
            "NAXIS1": 20,
            "NAXIS2": 20,
            "CRPIX1": 10.0,
            "CRPIX2": 10.0,
            "CRVAL1": 45.0,
            "CRVAL2": 45.0,
            "CDELT1": -2.0 * ARCSEC_DEG,
            "CDELT2": 2.0 * ARCSEC_DEG,
        })))
        .unwrap();
        let cd = WcsSolution::tan(
            [20, 20],
            [10.0, 10.0],
            [45.0, 45.0],
            [[-2.0 * ARCSEC_DEG, 0.0], [0.0, 2.0 * ARCSEC_DEG]],
            CelestialFrame::Icrs,
        )
        .unwrap();

        assert_eq!(pc.frame, CelestialFrame::Icrs);
        let a = pc.pixel_to_world(3.0, 17.0).unwrap();
        let b = cd.pixel_to_world(3.0, 17.0).unwrap();
        assert_close(a.0, b.0, 1e-12);
        assert_close(a.1, b.1, 1e-12);
    }

    #[test]
    fn test_integer_valued_reals_accepted() {
        let mut header = astrometry_header();
        header.insert("IMAGEW".into(), json!(1024.0));
        header.insert("A_ORDER".into(), json!(2.0));
        let wcs = WcsSolution::from_header(header).unwrap();
        assert_eq!(wcs.image_size(), [1024, 768]);
    }

    #[test]
    fn test_rejects_unknown_projection() {
        let mut header = astrometry_header();
        header.insert("CTYPE1".into(), "RA---XYZ".into());
        header.insert("CTYPE2".into(), "DEC--XYZ".into());
        let err = WcsSolution::from_header(header).unwrap_err();
        assert!(matches!(err, Error::Wcs { .. }));
    }

    #[test]
    fn test_rejects_galactic_axes() {
        let mut header = astrometry_header();
        header.insert("CTYPE1".into(), "GLON-TAN".into());
        let err = WcsSolution::from_header(header).unwrap_err();
        assert!(err.to_string().contains("GLON-TAN"));
    }

    #[test]
    fn test_missing_reference_value() {
        let mut header = astrometry_header();
        header.remove("CRVAL2");
        let err = WcsSolution::from_header(header).unwrap_err();
        assert!(err.to_string().contains("CRVAL2"));
    }

    #[test]
    fn test_missing_image_size() {
        let mut header = astrometry_header();
        header.remove("IMAGEH");
        let err = WcsSolution::from_header(header).unwrap_err();
        assert!(err.to_string().contains("IMAGEH"));
    }
}
