//! Result sink: line-delimited endpoint lists written atomically

use crate::proxy::models::Endpoint;
use crate::Result;
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Render endpoints as `socks4://address:port` lines, each newline-terminated
pub fn render_endpoints(endpoints: &[Endpoint]) -> String {
    endpoints.iter().map(|e| format!("{}\n", e)).collect()
}

/// Save endpoints to `path`.
///
/// The list is written to a temporary file beside `path` and renamed over
/// it, so readers see either the previous file or the complete new one.
pub fn save_endpoints<P: AsRef<Path>>(endpoints: &[Endpoint], path: P) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    file.write_all(render_endpoints(endpoints).as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}
