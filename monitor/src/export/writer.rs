use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ExportWriteError;

/// Writes `rows` as CSV (header from the row type) to a `.tmp` sibling of
/// `path`, syncs it and renames it into place. On failure the temporary
/// file is removed and `path` is left as it was.
pub fn write_atomic<R: Serialize>(path: &Path, rows: &[R]) -> Result<(), ExportWriteError> {
    let tmp = tmp_path(path);

    let result = write_rows(&tmp, rows).and_then(|()| {
        fs::rename(&tmp, path).map_err(|source| ExportWriteError::Io {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_rows<R: Serialize>(tmp: &Path, rows: &[R]) -> Result<(), ExportWriteError> {
    let io_err = |source: io::Error| ExportWriteError::Io {
        path: tmp.to_path_buf(),
        source,
    };

    let file = File::create(tmp).map_err(io_err)?;
    let mut w = csv::Writer::from_writer(file);

    for row in rows {
        w.serialize(row).map_err(|source| ExportWriteError::Csv {
            path: tmp.to_path_buf(),
            source,
        })?;
    }

    w.flush().map_err(io_err)?;
    let file = w
        .into_inner()
        .map_err(|e| io_err(io::Error::new(e.error().kind(), e.error().to_string())))?;
    file.sync_all().map_err(io_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
