use crate::error::CamParamsError;
use log::debug;
use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Kind of directory entry collected by [`sorted_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Every entry, whatever its type.
    Any,
    Directory,
}

/// Ensure the output directory exists, creating it and any missing parents.
pub fn ensure_output_dir(path: &Path) -> Result<(), CamParamsError> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| CamParamsError::io(path, e))?;
        debug!("Created output directory {}", path.display());
    }
    Ok(())
}

/// Write `contents` to `path` through a sibling temporary file that is renamed
/// into place once fully flushed, so a failed run never leaves a truncated file.
pub fn write_file_atomic(path: &Path, contents: &str) -> Result<(), CamParamsError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CamParamsError::io(path, std::io::ErrorKind::InvalidInput.into()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        writer.write_all(contents.as_bytes())?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(CamParamsError::io(path, e));
    }
    Ok(())
}

/// Load a whitespace-delimited, row-major matrix of `f64` values from a text file.
///
/// Blank lines and lines starting with `#` are ignored. Every remaining row must
/// have the same number of columns.
///
/// # Errors
///
/// * [`CamParamsError::Input`] if the file is missing, a token is not a number,
///   the rows are ragged, or the file holds no values at all.
pub fn load_matrix(path: &Path) -> Result<DMatrix<f64>, CamParamsError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CamParamsError::input(path, format!("cannot read file: {e}")))?;
    parse_matrix(&contents).map_err(|reason| CamParamsError::input(path, reason))
}

/// Parse the textual matrix format read by [`load_matrix`].
pub fn parse_matrix(contents: &str) -> Result<DMatrix<f64>, String> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    format!("line {}: '{}' is not a number", line_no + 1, token)
                })
            })
            .collect::<Result<Vec<f64>, String>>()?;

        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(format!(
                    "line {}: expected {} columns, found {}",
                    line_no + 1,
                    first.len(),
                    row.len()
                ));
            }
        }
        rows.push(row);
    }

    let ncols = match rows.first() {
        Some(first) => first.len(),
        None => return Err("file contains no matrix values".to_string()),
    };
    let nrows = rows.len();
    let values: Vec<f64> = rows.into_iter().flatten().collect();

    Ok(DMatrix::from_row_slice(nrows, ncols, &values))
}

/// Check that a loaded matrix has at least `rows` x `cols` entries.
pub fn require_shape(
    matrix: &DMatrix<f64>,
    rows: usize,
    cols: usize,
    path: &Path,
) -> Result<(), CamParamsError> {
    if matrix.nrows() < rows || matrix.ncols() < cols {
        return Err(CamParamsError::input(
            path,
            format!(
                "expected at least a {}x{} matrix, found {}x{}",
                rows,
                cols,
                matrix.nrows(),
                matrix.ncols()
            ),
        ));
    }
    Ok(())
}

/// List the entries of `dir` of the given kind, sorted lexicographically by file name.
///
/// Nothing but the kind is filtered: hidden entries are listed too. The
/// position in the returned vector is the image index used by every output record.
pub fn sorted_entries(dir: &Path, kind: EntryKind) -> Result<Vec<PathBuf>, CamParamsError> {
    let read_dir = fs::read_dir(dir).map_err(|e| CamParamsError::io(dir, e))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| CamParamsError::io(dir, e))?;
        let path = entry.path();
        let matches = match kind {
            EntryKind::Any => true,
            EntryKind::Directory => path.is_dir(),
        };
        if matches {
            entries.push(path);
        }
    }

    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// Format a value with the shortest representation that parses back to the same `f64`.
///
/// Negative zero is written as `0`.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Format values separated by single spaces.
pub fn join_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_value(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse space separated values produced by [`join_values`].
pub fn split_values(text: &str) -> Result<Vec<f64>, String> {
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("'{token}' is not a number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matrix() {
        let text = "# intrinsics\n1000 0 960\n0 1000 540\n\n0 0 1\n";
        let m = parse_matrix(text).unwrap();
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(0, 0)], 1000.0);
        assert_eq!(m[(0, 2)], 960.0);
        assert_eq!(m[(1, 2)], 540.0);
    }

    #[test]
    fn test_parse_matrix_rejects_bad_input() {
        assert!(parse_matrix("").is_err());
        assert!(parse_matrix("# only a comment\n").is_err());
        assert!(parse_matrix("1 2 3\n4 5\n").is_err());
        let err = parse_matrix("1 2 x\n").unwrap_err();
        assert!(err.contains("'x'"), "unexpected message: {err}");
    }

    #[test]
    fn test_load_matrix_missing_file() {
        let err = load_matrix(Path::new("does/not/exist.txt")).unwrap_err();
        assert!(matches!(err, CamParamsError::Input { .. }));
    }

    #[test]
    fn test_require_shape() {
        let m = parse_matrix("1 2\n3 4\n").unwrap();
        assert!(require_shape(&m, 2, 2, Path::new("m.txt")).is_ok());
        assert!(require_shape(&m, 2, 3, Path::new("m.txt")).is_err());
    }

    #[test]
    fn test_sorted_entries_is_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.txt", "1.txt", "0.txt", ".hidden"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let all = sorted_entries(dir.path(), EntryKind::Any).unwrap();
        let names: Vec<_> = all
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![".hidden", "0.txt", "1.txt", "10.txt", "subdir"]);

        let dirs = sorted_entries(dir.path(), EntryKind::Directory).unwrap();
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].ends_with("subdir"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(-0.0), "0");
        assert_eq!(format_value(0.1), "0.1");
        let third = 1000.0 / 36.0;
        assert_eq!(format_value(third).parse::<f64>().unwrap(), third);
        assert_eq!(join_values(&[1.0, 2.5, -3.0]), "1 2.5 -3");
        assert_eq!(split_values("1 2.5 -3").unwrap(), vec![1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_write_file_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_000.cam");
        write_file_atomic(&path, "first\n").unwrap();
        write_file_atomic(&path, "second\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!dir.path().join("image_000.cam.tmp").exists());

        let missing = dir.path().join("missing").join("image_000.cam");
        assert!(matches!(
            write_file_atomic(&missing, "x"),
            Err(CamParamsError::Io { .. })
        ));
    }

    #[test]
    fn test_ensure_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_output_dir(&nested).unwrap();
    }
}
