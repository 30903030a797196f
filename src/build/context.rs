// ABOUTME: Build context packing.
// ABOUTME: Archives a context directory into the tar stream the engine expects.

use bytes::Bytes;
use std::io;
use std::path::Path;

/// Pack a context directory into an in-memory tar archive.
///
/// Paths inside the archive are relative to the context root, which is
/// what the engine resolves the Dockerfile against.
// TODO: honor .dockerignore so target/ and .git/ stay out of the archive
pub fn archive_context(context: &Path) -> io::Result<Bytes> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", context)?;
    let data = builder.into_inner()?;
    Ok(Bytes::from(data))
}
