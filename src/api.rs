//! File-level API: read a stub fully, transform it in memory, write it back.
//!
//! Output goes through a temporary file in the destination directory that is
//! renamed into place, so a reader never observes a half-written stub and a
//! failed call leaves the destination untouched. Rewriting an existing file
//! keeps its permissions. File handles are scoped to each helper and closed
//! on every exit path.

use anyhow::Context;
use log::{debug, info, trace};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

use crate::attribution::{self, Bitness};
use crate::exceptions::Result;
use crate::pe::{self, DirectoryEntry};

/// Options for patching a stub on disk
#[derive(Debug, Default)]
pub struct PatchOptions {
    /// Destination path; `None` rewrites the input file
    pub output: Option<PathBuf>,
    /// Re-read the written file and check the stored code
    pub verify: bool,
}

/// Outcome of a successful patch
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub output: PathBuf,
    /// Canonical code that was written
    pub code: String,
    /// File offset of the payload
    pub offset: usize,
    pub file_size: usize,
    /// `None` when verification was not requested
    pub verified: Option<bool>,
}

/// Attribution-relevant layout of a stub on disk
#[derive(Debug, Clone, Serialize)]
pub struct StubInfo {
    pub path: PathBuf,
    pub file_size: usize,
    pub has_mz_signature: bool,
    pub cert_directory: DirectoryEntry,
    pub payload_offset: usize,
    pub payload_capacity: usize,
    /// Stored code up to the first NUL; empty for a fresh stub
    pub attribution: String,
}

fn read_stub(path: &Path) -> anyhow::Result<Vec<u8>> {
    let data = fs::read(path).with_context(|| format!("reading stub {}", path.display()))?;
    trace!("Read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

/// Write `data` to `dest` via a sibling temp file and an atomic rename.
fn write_atomic(dest: &Path, data: &[u8]) -> anyhow::Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // An existing destination keeps its mode; a new one gets the umask default
    let existing = match fs::metadata(dest) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("reading metadata of {}", dest.display()));
        }
    };

    let mut builder = Builder::new();
    builder.prefix(".stubattr-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if existing.is_none() {
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
    }

    let mut tmp = builder
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(data).context("writing patched stub")?;
    tmp.as_file().sync_all().context("syncing patched stub")?;
    if let Some(permissions) = existing {
        tmp.as_file()
            .set_permissions(permissions)
            .with_context(|| format!("copying permissions of {}", dest.display()))?;
    }
    tmp.persist(dest)
        .with_context(|| format!("renaming patched stub to {}", dest.display()))?;

    debug!("Wrote {} bytes to {}", data.len(), dest.display());
    Ok(())
}

/// Embed `raw_code` into the stub at `input`.
///
/// The input is read fully into memory and patched as a private copy; the
/// result is written to `options.output` (or over `input`). Validation or
/// layout errors are returned before anything is written.
pub fn patch_file(input: &Path, raw_code: &str, options: PatchOptions) -> Result<PatchReport> {
    let original = read_stub(input)?;
    let (patched, code) = attribution::attribute(&original, raw_code)?;
    let directory = pe::locate_cert_directory(&patched)?;
    let offset = pe::find_reserved_offset(&patched, &directory)?;

    let output = options.output.unwrap_or_else(|| input.to_path_buf());
    write_atomic(&output, &patched)?;

    let verified = if options.verify {
        let written = read_stub(&output)?;
        let stored = attribution::read_attribution(&written)?;
        let ok = written.len() == patched.len() && stored.starts_with(code.as_str());
        debug!("Read-back verification of {}: {}", output.display(), ok);
        Some(ok)
    } else {
        None
    };

    info!(
        "Patched {} -> {} ({} bytes, code_len={})",
        input.display(),
        output.display(),
        patched.len(),
        code.len()
    );

    Ok(PatchReport {
        output,
        code: code.as_str().to_string(),
        offset,
        file_size: patched.len(),
        verified,
    })
}

/// Describe the attribution layout of the stub at `path`.
pub fn inspect_file(path: &Path) -> Result<StubInfo> {
    let data = read_stub(path)?;
    let cert_directory = pe::locate_cert_directory(&data)?;
    let payload_offset = pe::find_reserved_offset(&data, &cert_directory)?;
    let payload = attribution::read_payload(&data)?;
    let attribution = attribution::read_attribution(&data)?;

    Ok(StubInfo {
        path: path.to_path_buf(),
        file_size: data.len(),
        has_mz_signature: pe::is_pe_executable(&data),
        cert_directory,
        payload_offset,
        payload_capacity: payload.len(),
        attribution,
    })
}

/// Write a freshly generated test stub to `path`.
pub fn write_stub_file(path: &Path, bitness: Bitness) -> Result<()> {
    let stub = attribution::generate_stub(bitness);
    write_atomic(path, &stub)?;
    info!("Created {}-bit stub at {}", bitness, path.display());
    Ok(())
}
