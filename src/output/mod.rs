pub mod profile_writer;
pub mod report;

pub use profile_writer::{join_profiles, write_summary, ProfileWriter};
pub use report::{write_report, RunReport};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::{PipelineError, Result};

/// Write through a sibling temp file and rename into place, so a failed run
/// never leaves a half-written table at `path`.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    let persist_err = |e: anyhow::Error| PipelineError::persistence(path, e);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persist_err(e.into()))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| persist_err(anyhow::anyhow!("output path has no file name")))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = File::create(&tmp_path)
        .map_err(anyhow::Error::from)
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            write(&mut out)?;
            out.flush()?;
            Ok(())
        })
        .and_then(|()| fs::rename(&tmp_path, path).map_err(anyhow::Error::from));

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_err(e));
    }
    Ok(())
}
