//! Utility functions for reading files

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Error, Result};

/// `get_file_as_byte_vec` reads the named file and returns its contents.
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match File::open(filename) {
        Ok(mut f) => {
            let mut buffer = Vec::new();
            match f.read_to_end(&mut buffer) {
                Ok(_) => Ok(buffer),
                Err(e) => Err(Error::StdIoError(e.kind())),
            }
        }
        Err(e) => Err(Error::StdIoError(e.kind())),
    }
}

#[test]
fn get_file_as_byte_vec_test() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("policy.json");
    std::fs::write(&p, b"{}").unwrap();
    assert_eq!(b"{}".to_vec(), get_file_as_byte_vec(&p).unwrap());
    assert_eq!(
        Err(Error::StdIoError(std::io::ErrorKind::NotFound)),
        get_file_as_byte_vec(&dir.path().join("missing.json"))
    );
}
