use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Mapping length must be non-zero")]
    ZeroLength,

    #[error("File too small: {file_len} bytes, mapping needs {length}")]
    FileTooSmall { file_len: u64, length: usize },

    #[error("Failed to map file: {0}")]
    Map(#[source] io::Error),

    #[error("Failed to unmap file: {0}")]
    Unmap(#[source] io::Error),

    #[error("Offset {offset} + {width} exceeds mapping length {len}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("Offset {offset} is not 8-byte aligned")]
    Misaligned { offset: usize },

    #[error("Mapping is read-only")]
    ReadOnly,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_formatting() {
        let err = MapError::ZeroLength;
        assert_eq!(
            err.to_string(),
            "Mapping length must be non-zero",
            "ZeroLength should display correct message"
        );

        let err = MapError::FileTooSmall {
            file_len: 10,
            length: 4096,
        };
        assert_eq!(
            err.to_string(),
            "File too small: 10 bytes, mapping needs 4096",
            "FileTooSmall should report both sizes"
        );

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = MapError::Map(io_err);
        assert_eq!(
            err.to_string(),
            "Failed to map file: access denied",
            "Map should display with 'Failed to map file:' prefix"
        );

        let err = MapError::OutOfBounds {
            offset: 4089,
            width: 8,
            len: 4096,
        };
        assert_eq!(
            err.to_string(),
            "Offset 4089 + 8 exceeds mapping length 4096",
            "OutOfBounds should report offset, width and length"
        );

        let err = MapError::Misaligned { offset: 3 };
        assert_eq!(err.to_string(), "Offset 3 is not 8-byte aligned");

        let err = MapError::ReadOnly;
        assert_eq!(err.to_string(), "Mapping is read-only");
    }

    #[test]
    fn test_os_errors_keep_source() {
        let err = MapError::Unmap(io::Error::from_raw_os_error(22));

        let source = err
            .source()
            .and_then(|e| e.downcast_ref::<io::Error>())
            .expect("Unmap should expose the io::Error as source");
        assert_eq!(source.raw_os_error(), Some(22));
    }
}
