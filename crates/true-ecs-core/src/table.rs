//! Pixel-coordinate input tables and the sky-coordinate output table.
//!
//! Pixel tables are whitespace-delimited text; blank lines and `#`
//! comments are ignored. Only the X and Y columns are interpreted, every
//! other column is carried through to the output verbatim.

use std::path::Path;

use crate::config::TableLayout;
use crate::error::{Error, Result};
use crate::frames::CelestialFrame;

/// A pixel table read from a per-directory data file.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl PixelTable {
    /// Read a pixel table from disk.
    pub fn read<P: AsRef<Path>>(path: P, layout: &TableLayout) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, layout).map_err(|message| Error::Table {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse a pixel table from text.
    pub fn parse(contents: &str, layout: &TableLayout) -> std::result::Result<Self, String> {
        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let header: Vec<(usize, &str)> = lines.by_ref().take(layout.header_lines).collect();
        if header.len() < layout.header_lines {
            return Err(format!(
                "expected {} header line(s), found {}",
                layout.header_lines,
                header.len()
            ));
        }

        let columns: Vec<String> = match &layout.column_names {
            Some(names) => names.clone(),
            None => match header.last() {
                Some((_, line)) => line.split_whitespace().map(str::to_string).collect(),
                None => return Err("no header row to take column names from".to_string()),
            },
        };

        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| format!("missing required column '{}'", name))
        };
        let x_col = position("X")?;
        let y_col = position("Y")?;

        let mut table = PixelTable {
            columns: columns.clone(),
            rows: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
        };

        for (line_no, line) in lines {
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if fields.len() != columns.len() {
                return Err(format!(
                    "line {}: expected {} fields, found {}",
                    line_no,
                    columns.len(),
                    fields.len()
                ));
            }
            let coordinate = |col: usize| {
                fields[col].parse::<f64>().map_err(|_| {
                    format!(
                        "line {}: {} value '{}' is not a number",
                        line_no, columns[col], fields[col]
                    )
                })
            };
            table.x.push(coordinate(x_col)?);
            table.y.push(coordinate(y_col)?);
            table.rows.push(fields);
        }

        Ok(table)
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw text rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Parsed (X, Y) pixel positions, one per row.
    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sky coordinates derived from a pixel table, row for row.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyTable {
    /// Frame the coordinates are expressed in
    pub frame: CelestialFrame,
    /// Right ascension in degrees
    pub ra: Vec<f64>,
    /// Declination in degrees
    pub dec: Vec<f64>,
}

impl SkyTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }
}

/// The combined output: RA, DEC followed by the original pixel columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl OutputTable {
    /// Stack the sky columns in front of the pixel columns.
    ///
    /// A pixel column named like a sky column is disambiguated: the sky
    /// column gets the `_1` suffix and the pixel column the `_2` suffix.
    pub fn assemble(sky: &SkyTable, pixels: &PixelTable) -> Result<Self> {
        if sky.len() != pixels.len() {
            return Err(Error::Table {
                path: String::new(),
                message: format!(
                    "sky table has {} rows but pixel table has {}",
                    sky.len(),
                    pixels.len()
                ),
            });
        }

        let clashes = |name: &str| pixels.columns().iter().any(|c| c == name);
        let mut header: Vec<String> = ["RA", "DEC"]
            .iter()
            .map(|name| {
                if clashes(name) {
                    format!("{}_1", name)
                } else {
                    name.to_string()
                }
            })
            .collect();
        header.extend(pixels.columns().iter().map(|c| {
            if c == "RA" || c == "DEC" {
                format!("{}_2", c)
            } else {
                c.clone()
            }
        }));

        let rows = sky
            .ra
            .iter()
            .zip(&sky.dec)
            .zip(pixels.rows())
            .map(|((ra, dec), fields)| {
                let mut row = Vec::with_capacity(fields.len() + 2);
                row.push(ra.to_string());
                row.push(dec.to_string());
                row.extend(fields.iter().cloned());
                row
            })
            .collect();

        Ok(Self { header, rows })
    }

    /// Column names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Formatted rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Write as CSV, replacing any existing file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
