use std::{fs, io::Write, path::Path};

use crate::status::StatusSnapshot;

pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// Publish a status snapshot as pretty JSON, replacing the file atomically.
pub fn write_status(path: &Path, status: &StatusSnapshot) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(status).map_err(std::io::Error::other)?;
    write_atomic(path, &json)
}
