//! Comma-separated numeric tables without header, the on-disk format of
//! the RBM and Ising weight files.
//!
//! Reading follows `numpy.loadtxt(delimiter=',')`: blank lines and `#`
//! comments are skipped and a single row or column reads as a flat vector.
//! Writing follows `numpy.savetxt` with its default `%.18e` format, one row
//! per line (one value per line for vectors).

use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Parsed rows of a numeric table, all of equal width.
struct Rows {
    values: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

fn read_rows(path: &Path) -> Result<Rows> {
    let file = File::open(path).map_err(|e| Error::read(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut values = Vec::new();
    let mut nrows = 0usize;
    let mut ncols = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            parse_error(path, line, e.to_string())
        })?;
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        if nrows == 0 {
            ncols = record.len();
        } else if record.len() != ncols {
            return Err(parse_error(
                path,
                line,
                format!("expected {} columns, found {}", ncols, record.len()),
            ));
        }
        for cell in record.iter() {
            let v: f64 = cell
                .parse()
                .map_err(|_| parse_error(path, line, format!("not a number: {:?}", cell)))?;
            values.push(v);
        }
        nrows += 1;
    }

    Ok(Rows {
        values,
        nrows,
        ncols,
    })
}

fn parse_error(path: &Path, line: u64, message: String) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        line: line as usize,
        message,
    }
}

/// Read a 2-D table. A single-line file gives a 1 x n matrix.
pub fn read_matrix(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    Array2::from_shape_vec((rows.nrows, rows.ncols), rows.values)
        .map_err(|e| parse_error(path, 0, e.to_string()))
}

/// Read a vector stored either as one value per line or as a single row.
pub fn read_vector(path: impl AsRef<Path>) -> Result<Array1<f64>> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    if rows.nrows > 1 && rows.ncols > 1 {
        return Err(parse_error(
            path,
            0,
            format!("expected a vector, found a {}x{} table", rows.nrows, rows.ncols),
        ));
    }
    Ok(Array1::from(rows.values))
}

/// Read a single-column sample file (e.g. energies recorded by a sampler).
pub fn read_column(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let rows = read_rows(path)?;
    if rows.ncols > 1 {
        return Err(parse_error(
            path,
            0,
            format!("expected a single column, found {}", rows.ncols),
        ));
    }
    Ok(rows.values)
}

pub fn write_matrix(path: impl AsRef<Path>, matrix: &Array2<f64>) -> Result<()> {
    write_atomic(path.as_ref(), |out| {
        for row in matrix.rows() {
            out.write_record(row.iter().map(|&v| format_value(v)))?;
        }
        Ok(())
    })
}

pub fn write_vector(path: impl AsRef<Path>, vector: &Array1<f64>) -> Result<()> {
    write_atomic(path.as_ref(), |out| {
        for &v in vector {
            out.write_record([format_value(v)])?;
        }
        Ok(())
    })
}

/// Write into a sibling temp file, then rename over `path`, so readers only
/// ever observe a complete table.
fn write_atomic<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<BufWriter<File>>) -> Result<()>,
{
    let tmp = partial_path(path);
    let result = (|| -> Result<()> {
        let file = File::create(&tmp).map_err(|e| Error::Io {
            path: tmp.clone(),
            source: e,
        })?;
        let mut out = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(BufWriter::new(file));
        body(&mut out)?;
        out.flush()
            .and_then(|_| out.get_ref().get_ref().sync_all())
            .map_err(|e| Error::Io {
                path: tmp.clone(),
                source: e,
            })?;
        drop(out);
        fs::rename(&tmp, path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// `%.18e` with a sign and at least two exponent digits, as C printf writes it.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{:.18e}", v);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => s,
    }
}
