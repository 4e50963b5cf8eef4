use flate2::read::GzDecoder;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Bytes needed to recognise every supported format.
const HEADER_LEN: u64 = 512;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const SEVEN_ZIP_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    Tar(TarCompression),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TarCompression {
    None,
    Gzip,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::SevenZip => write!(f, "7z"),
            ArchiveFormat::Tar(TarCompression::None) => write!(f, "tar"),
            ArchiveFormat::Tar(TarCompression::Gzip) => write!(f, "tar.gz"),
        }
    }
}

/// Identifies an archive from its leading bytes.
///
/// Gzip streams are not reported here because the gzip magic alone does not
/// say whether a tar archive is inside; see [`detect_path`].
pub fn detect_format(header: &[u8]) -> Option<ArchiveFormat> {
    match header {
        [0x50, 0x4B, 0x03, 0x04, ..] | [0x50, 0x4B, 0x05, 0x06, ..] => Some(ArchiveFormat::Zip),
        _ if header.starts_with(&SEVEN_ZIP_MAGIC) => Some(ArchiveFormat::SevenZip),
        _ if is_tar_header(header) => Some(ArchiveFormat::Tar(TarCompression::None)),
        _ => None,
    }
}

/// POSIX (`ustar\0`) and GNU (`ustar  \0`) headers share the `ustar` magic.
fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN as usize && &data[257..262] == b"ustar"
}

/// Probes a file on disk.
///
/// Returns `Ok(None)` for anything that is not a supported archive, including
/// files too short to carry a header and gzip files that do not wrap a tar.
/// Errors are reserved for failures to open or read the file itself.
pub fn detect_path(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    file.by_ref().take(HEADER_LEN).read_to_end(&mut header)?;

    if let Some(format) = detect_format(&header) {
        return Ok(Some(format));
    }

    if header.starts_with(&GZIP_MAGIC) {
        let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
        let mut decoded = Vec::with_capacity(HEADER_LEN as usize);
        // A gzip stream that cannot be decoded is just an opaque file.
        if decoder.take(HEADER_LEN).read_to_end(&mut decoded).is_ok() && is_tar_header(&decoded) {
            return Ok(Some(ArchiveFormat::Tar(TarCompression::Gzip)));
        }
    }

    Ok(None)
}
