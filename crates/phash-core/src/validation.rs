use crate::digest::Digest;
use crate::error::{DigestSide, Error, Result};
use crate::logging::log_file_error;
use std::fs::File;
use std::path::Path;

/// Check that a path is an existing, readable regular file
///
/// Runs before any engine call; has no side effects besides logging.
pub fn ensure_readable<P: AsRef<Path>>(path: P) -> Result<()> {
    let path_ref = path.as_ref();
    let not_readable = || Error::FileNotReadable {
        path: path_ref.to_path_buf(),
    };

    let metadata = match std::fs::metadata(path_ref) {
        Ok(metadata) => metadata,
        Err(e) => {
            log_file_error(path_ref, "metadata", &e);
            return Err(not_readable());
        }
    };

    if !metadata.is_file() {
        log_file_error(
            path_ref,
            "check_file",
            &std::io::Error::new(std::io::ErrorKind::InvalidInput, "Not a regular file"),
        );
        return Err(not_readable());
    }

    // Opening is the only portable readability test
    if let Err(e) = File::open(path_ref) {
        log_file_error(path_ref, "open", &e);
        return Err(not_readable());
    }

    Ok(())
}

/// Check that a digest carries a coefficient sequence consistent with its size
pub fn ensure_well_formed(digest: &Digest, which: DigestSide) -> Result<&[u8]> {
    match digest.coeffs() {
        Some(coeffs) if coeffs.len() == digest.size() => Ok(coeffs),
        _ => Err(Error::MalformedDigest { which }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_not_readable() {
        let err = ensure_readable("does/not/exist.jpg").unwrap_err();
        match err {
            Error::FileNotReadable { path } => assert_eq!(path, Path::new("does/not/exist.jpg")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_directory_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_readable(dir.path()).unwrap_err();
        assert!(matches!(err, Error::FileNotReadable { .. }));
    }

    #[test]
    fn test_regular_file_readable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"DUMMY IMAGE DATA").unwrap();
        assert!(ensure_readable(file.path()).is_ok());
    }

    #[test]
    fn test_well_formed_reports_side() {
        let good = Digest::new(None, vec![1, 2, 3]);
        let bad = Digest::default();

        assert_eq!(ensure_well_formed(&good, DigestSide::X).unwrap(), &[1, 2, 3]);
        assert!(matches!(
            ensure_well_formed(&bad, DigestSide::X),
            Err(Error::MalformedDigest { which: DigestSide::X })
        ));
        assert!(matches!(
            ensure_well_formed(&bad, DigestSide::Y),
            Err(Error::MalformedDigest { which: DigestSide::Y })
        ));
    }
}
