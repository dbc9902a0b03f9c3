//! ASCII target file reading and writing.
//!
//! The format is a plain whitespace separated table. The writer emits a
//! header of `ndim npoints nvar` followed by one row per point holding
//! `ndim` coordinates and `nvar` variables; the reader consumes the two
//! field header `ndim npoints` followed by the coordinate rows. Numbers
//! are written 15 wide in scientific notation with 8 digits of
//! precision.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Errors surfaced by the target file routines.
#[derive(Debug, thiserror::Error)]
pub enum TargetFileError {
    /// The file could not be opened, read, or written.
    #[error("target file {path}: {source}")]
    Io {
        /// The offending file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file content does not match the format.
    #[error("malformed target file {path}: {reason}")]
    Malformed {
        /// The offending file.
        path: PathBuf,
        /// What did not parse.
        reason: String,
    },
    /// The header declares more dimensions than the pipeline supports.
    #[error("target file {path} declares {ndim} dimensions, at most 3 are supported")]
    TooManyDimensions {
        /// The offending file.
        path: PathBuf,
        /// The declared dimension count.
        ndim: usize,
    },
}

/// Read a target file, returning `(ndim, npoints, xyz)` with the
/// coordinates interleaved point by point.
pub fn read_target_file(path: &Path) -> Result<(usize, usize, Vec<f64>), TargetFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| TargetFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut fields = content.split_whitespace();

    let mut next_field = |what: &str| {
        fields.next().ok_or_else(|| TargetFileError::Malformed {
            path: path.to_path_buf(),
            reason: format!("missing {what}"),
        })
    };

    let ndim: usize = next_field("dimension count")?
        .parse()
        .map_err(|_| TargetFileError::Malformed {
            path: path.to_path_buf(),
            reason: "dimension count is not an integer".into(),
        })?;
    if ndim > 3 {
        return Err(TargetFileError::TooManyDimensions {
            path: path.to_path_buf(),
            ndim,
        });
    }
    let npoints: usize = next_field("point count")?
        .parse()
        .map_err(|_| TargetFileError::Malformed {
            path: path.to_path_buf(),
            reason: "point count is not an integer".into(),
        })?;

    let mut xyz = Vec::with_capacity(ndim * npoints);
    for index in 0..ndim * npoints {
        let value: f64 = next_field("coordinate")?
            .parse()
            .map_err(|_| TargetFileError::Malformed {
                path: path.to_path_buf(),
                reason: format!("coordinate {index} is not a number"),
            })?;
        xyz.push(value);
    }

    Ok((ndim, npoints, xyz))
}

/// Write a target file with `nvar` variables per point.
pub fn write_target_file(
    path: &Path,
    ndim: usize,
    npoints: usize,
    xyz: &[f64],
    nvar: usize,
    var: &[f64],
) -> Result<(), TargetFileError> {
    if xyz.len() != ndim * npoints || var.len() != nvar * npoints {
        return Err(TargetFileError::Malformed {
            path: path.to_path_buf(),
            reason: format!(
                "array lengths {} and {} do not match {npoints} points",
                xyz.len(),
                var.len()
            ),
        });
    }

    let mut out = String::new();
    let _ = write!(out, "{ndim:>10}{npoints:>10}{nvar:>10}");
    out.push('\n');
    for i in 0..npoints {
        for j in 0..ndim {
            let _ = write!(out, "{:>15}", scientific(xyz[i * ndim + j]));
        }
        for j in 0..nvar {
            let _ = write!(out, "{:>15}", scientific(var[i * nvar + j]));
        }
        out.push('\n');
    }

    std::fs::write(path, out).map_err(|source| TargetFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Format with 8 digit precision and a signed two digit exponent.
fn scientific(value: f64) -> String {
    let formatted = format!("{value:.8e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}
