//! Text snapshots: a `<width>,<height>` header line followed by `height`
//! rows of `width` cell symbols, each row terminated by `\n`.

use std::fs;
use std::path::Path;

use crate::error::{LifeError, LifeResult};
use crate::grid::Grid;

/// Parse the `<width>,<height>` header (decimal digits, no spaces).
pub fn parse_header(line: &str) -> LifeResult<(usize, usize)> {
    let (w, h) = line
        .split_once(',')
        .ok_or_else(|| LifeError::malformed(1, format!("header {line:?} is not <width>,<height>")))?;
    let dim = |text: &str, name: &str| -> LifeResult<usize> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LifeError::malformed(
                1,
                format!("{name} {text:?} is not a decimal integer"),
            ));
        }
        text.parse::<usize>()
            .map_err(|err| LifeError::malformed(1, format!("{name} {text:?}: {err}")))
    };
    let width = dim(w, "width")?;
    let height = dim(h, "height")?;
    if width == 0 || height == 0 {
        return Err(LifeError::malformed(
            1,
            format!("dimensions must be at least 1x1, got {width}x{height}"),
        ));
    }
    Ok((width, height))
}

/// Parse a whole snapshot. A trailing `\r` on any line is ignored.
pub fn parse(text: &str) -> LifeResult<Grid> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    let (header, rows) = lines
        .split_first()
        .ok_or_else(|| LifeError::malformed(1, "empty snapshot"))?;
    let (width, height) = parse_header(header)?;
    Grid::load(rows, width, height)
}

/// Render the grid's current generation in snapshot format.
pub fn render(grid: &Grid) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * (grid.height() + 1) + 16);
    out.push_str(&format!("{},{}\n", grid.width(), grid.height()));
    for row in grid.serialize() {
        out.push_str(&row);
        out.push('\n');
    }
    out
}

pub fn read(path: impl AsRef<Path>) -> LifeResult<Grid> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| LifeError::io(path, err))?;
    let grid = parse(&text)?;
    log::debug!(
        "loaded {}x{} snapshot from {}",
        grid.width(),
        grid.height(),
        path.display()
    );
    Ok(grid)
}

pub fn write(path: impl AsRef<Path>, grid: &Grid) -> LifeResult<()> {
    let path = path.as_ref();
    fs::write(path, render(grid)).map_err(|err| LifeError::io(path, err))?;
    log::debug!("saved snapshot to {}", path.display());
    Ok(())
}

/// True when every line of `a` equals the corresponding line of `b`.
/// A line missing from `b` counts as a mismatch; extra lines in `b` do not.
pub fn files_match(a: impl AsRef<Path>, b: impl AsRef<Path>) -> LifeResult<bool> {
    let (a, b) = (a.as_ref(), b.as_ref());
    let left = fs::read_to_string(a).map_err(|err| LifeError::io(a, err))?;
    let right = fs::read_to_string(b).map_err(|err| LifeError::io(b, err))?;
    let mut right_lines = right.lines();
    for (number, line) in left.lines().enumerate() {
        if right_lines.next() != Some(line) {
            log::warn!(
                "{} and {} differ at line {}",
                a.display(),
                b.display(),
                number + 1
            );
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_header, render};
    use crate::error::LifeError;

    #[test]
    fn header_requires_plain_decimals() {
        assert_eq!(parse_header("12,7").unwrap(), (12, 7));
        for bad in ["12", "12,", ",7", "12 ,7", "+12,7", "-1,7", "0,7", "a,b", "12,7,1"] {
            assert!(
                matches!(parse_header(bad), Err(LifeError::MalformedInput { line: 1, .. })),
                "header {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_tolerates_crlf_and_missing_final_newline() {
        let grid = parse("3,2\r\nx..\r\n..x").unwrap();
        assert_eq!(grid.serialize(), vec!["x..", "..x"]);
    }

    #[test]
    fn parse_reports_offending_row_line() {
        let err = parse("3,3\nx..\n.x\n...\n").unwrap_err();
        assert!(matches!(err, LifeError::MalformedInput { line: 3, .. }));
        let err = parse("3,3\nx..\n...\n").unwrap_err();
        assert!(matches!(err, LifeError::MalformedInput { .. }));
        assert!(parse("").is_err());
    }

    #[test]
    fn render_writes_header_and_rows() {
        let grid = parse("4,2\n.x..\nxx.x\n").unwrap();
        assert_eq!(render(&grid), "4,2\n.x..\nxx.x\n");
    }
}
