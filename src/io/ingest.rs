//! CSV trace ingest.
//!
//! Input schema: two numeric columns, `x` then `y`, one sample per row. A
//! header row is detected by attempting to parse the first record; files with
//! or without headers both work. Rows must keep x monotonically non-decreasing
//! (the fitters enforce this again, but failing here gives a line number).

use std::path::Path;

use crate::error::AppError;

/// A raw (x, y) trace read from disk.
#[derive(Debug, Clone)]
pub struct Trace {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Read a two-column CSV trace.
pub fn read_trace_csv(path: &Path) -> Result<Trace, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to open '{}': {e}", path.display())))?;

    let mut x = Vec::new();
    let mut y = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AppError::invalid_input(format!("CSV error in '{}': {e}", path.display())))?;
        if record.len() < 2 {
            return Err(AppError::invalid_input(
                format!("Row {} of '{}' has fewer than two columns.", row + 1, path.display()),
            ));
        }

        let parsed = (
            record[0].parse::<f64>(),
            record[1].parse::<f64>(),
        );
        match parsed {
            (Ok(xv), Ok(yv)) => {
                if !(xv.is_finite() && yv.is_finite()) {
                    return Err(AppError::invalid_input(
                        format!("Non-finite value at row {} of '{}'.", row + 1, path.display()),
                    ));
                }
                x.push(xv);
                y.push(yv);
            }
            _ if row == 0 => {
                // header row; skip
            }
            _ => {
                return Err(AppError::invalid_input(
                    format!("Unparseable numeric value at row {} of '{}'.", row + 1, path.display()),
                ));
            }
        }
    }

    if x.is_empty() {
        return Err(AppError::insufficient_data(format!("No data rows in '{}'.", path.display())));
    }
    if let Some(pos) = x.windows(2).position(|w| w[1] < w[0]) {
        return Err(AppError::invalid_input(
            format!(
                "x must be monotonically non-decreasing; violated at row {} of '{}'.",
                pos + 2,
                path.display()
            ),
        ));
    }

    Ok(Trace { x, y })
}
