use crate::{build::write_blorb, errors::Error, extract::read_blorb, substitute::substitute};
use std::{
    ffi::OsString,
    fs,
    fs::File,
    io::{Cursor, Read, Seek},
    path::{Path, PathBuf},
};
use tracing::info;

/// Reads a Blorb file, adds a `BPal` table, and returns the new file's bytes.
pub fn transcode(
    input: &mut (impl Read + Seek),
    exec: Option<Vec<u8>>,
    recompress: impl Fn(&[u8]) -> Result<Vec<u8>, Error> + Sync,
) -> Result<Vec<u8>, Error> {
    let mut doc = read_blorb(input)?;
    substitute(&mut doc, recompress)?;
    doc.exec = exec;

    let mut out = Cursor::new(Vec::with_capacity(1 << 20));
    write_blorb(&mut out, &doc)?;
    Ok(out.into_inner())
}

/// Like [`transcode`], but between files. `output` is only created once the
/// whole file has been produced.
pub fn transcode_file(
    input: &Path,
    exec: Option<&Path>,
    output: &Path,
    recompress: impl Fn(&[u8]) -> Result<Vec<u8>, Error> + Sync,
) -> Result<(), Error> {
    let exec = match exec {
        Some(path) => Some(fs::read(path).map_err(|source| Error::ReadExec {
            path: path.to_owned(),
            source,
        })?),
        None => None,
    };

    let mut f = File::open(input)?;
    let data = transcode(&mut f, exec, recompress)?;
    drop(f);

    let staging = staging_path(output);
    if let Err(e) = fs::write(&staging, &data).and_then(|()| fs::rename(&staging, output)) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    info!(path = %output.display(), "done");
    Ok(())
}

fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map_or_else(|| OsString::from("out"), ToOwned::to_owned);
    name.push(".tmp");
    output.with_file_name(name)
}
