use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::models::datasets::blocks::BlockRecord;
use crate::models::errors::DatasetError;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes the records as one pretty-printed JSON array.
///
/// The data goes to a temporary file in the destination directory which then replaces the
/// destination in a single rename, so readers see either the old or the new dataset.
pub fn save(records: &[BlockRecord], destination: &Path) -> Result<(), DatasetError> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_error(&parent))?;

    let mut file = NamedTempFile::new_in(&parent).map_err(io_error(&parent))?;
    debug!("Writing {} blocks to {}", records.len(), file.path().display());

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, records)
            .map_err(|e| io_error(destination)(e.into()))?;
        writer.flush().map_err(io_error(destination))?;
    }
    file.as_file().sync_all().map_err(io_error(destination))?;

    file.persist(destination)
        .map_err(|e| io_error(destination)(e.error))?;

    info!("Saved {} blocks to {}", records.len(), destination.display());
    Ok(())
}

/// Reads a dataset written by [`save`]. Block numbers must be strictly increasing.
pub fn load(source: &Path) -> Result<Vec<BlockRecord>, DatasetError> {
    let file = match File::open(source) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DatasetError::NotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => return Err(io_error(source)(e)),
    };

    let records: Vec<BlockRecord> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| DatasetError::Corrupt {
            path: source.to_path_buf(),
            source: e,
        })?;

    if let Some(pair) = records.windows(2).find(|pair| pair[1].number <= pair[0].number) {
        return Err(DatasetError::OutOfOrder {
            path: source.to_path_buf(),
            previous: pair[0].number,
            number: pair[1].number,
        });
    }

    info!("Loaded {} blocks from {}", records.len(), source.display());
    Ok(records)
}
