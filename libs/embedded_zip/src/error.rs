/// Error type for zip entry reading operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipError {
    IoError(embedded_io::ErrorKind),
    InvalidSignature,
    UnsupportedCompression(u16),
    Encrypted,
    /// Sizes or offsets only resolvable through ZIP64 records.
    Zip64,
    DecompressionError,
    ChecksumMismatch { expected: u32, actual: u32 },
    InvalidData,
}

impl ZipError {
    pub(crate) fn from_io_error(error: impl embedded_io::Error) -> Self {
        ZipError::IoError(error.kind())
    }

    pub(crate) fn from_read_exact_error<E: embedded_io::Error>(
        error: embedded_io::ReadExactError<E>,
    ) -> Self {
        match error {
            embedded_io::ReadExactError::UnexpectedEof => ZipError::InvalidData,
            embedded_io::ReadExactError::Other(e) => ZipError::from_io_error(e),
        }
    }
}

impl core::fmt::Display for ZipError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ZipError::IoError(kind) => write!(f, "I/O error occurred: {kind:?}"),
            ZipError::InvalidSignature => write!(f, "Invalid zip signature"),
            ZipError::UnsupportedCompression(method) => {
                write!(f, "Unsupported compression method {method}")
            }
            ZipError::Encrypted => write!(f, "Encrypted entries are not supported"),
            ZipError::Zip64 => write!(f, "ZIP64 archives are not supported"),
            ZipError::DecompressionError => write!(f, "Error during decompression"),
            ZipError::ChecksumMismatch { expected, actual } => write!(
                f,
                "CRC-32 mismatch (expected {expected:#010x}, got {actual:#010x})"
            ),
            ZipError::InvalidData => write!(f, "Invalid zip data"),
        }
    }
}

impl embedded_io::Error for ZipError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            ZipError::IoError(kind) => *kind,
            ZipError::InvalidSignature
            | ZipError::InvalidData
            | ZipError::ChecksumMismatch { .. } => embedded_io::ErrorKind::InvalidData,
            ZipError::UnsupportedCompression(_) | ZipError::Encrypted | ZipError::Zip64 => {
                embedded_io::ErrorKind::Unsupported
            }
            ZipError::DecompressionError => embedded_io::ErrorKind::Other,
        }
    }
}
