//! Output file naming
//!
//! Captured jobs are spooled to `output-NNNN.gcode` files in the output
//! directory; translated artifacts land next to them. Numbering never
//! reuses a file that already has content, so an aborted run cannot
//! clobber a previous job.

use m1bridge_core::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// First `output-NNNN.gcode` in `dir` that does not exist yet or is an
/// empty regular file. The directory is created if needed.
pub fn next_output_path(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut index = 0u32;
    loop {
        let candidate = dir.join(format!("output-{index:04}.gcode"));
        match std::fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() && meta.len() == 0 => return Ok(candidate),
            Ok(_) => index += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(candidate),
            Err(e) => return Err(e.into()),
        }
    }
}
