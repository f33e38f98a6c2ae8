// src/core/sniff.rs

use crate::constants::SNIFF_HEADER_LEN;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Binary data of unknown kind.
pub const OCTET_STREAM: &str = "application/octet-stream";
/// ELF executable (Linux, BSD).
pub const ELF_EXECUTABLE: &str = "application/x-executable";
/// Mach-O binary (macOS).
pub const MACH_BINARY: &str = "application/x-mach-binary";
/// PE executable (Windows).
pub const DOS_EXECUTABLE: &str = "application/x-dosexec";
/// Text, including scripts.
pub const PLAIN_TEXT: &str = "text/plain";

/// Content types accepted as native engine executables.
pub const EXECUTABLE_CONTENT_TYPES: &[&str] =
    &[OCTET_STREAM, ELF_EXECUTABLE, MACH_BINARY, DOS_EXECUTABLE];

const MACH_MAGICS: &[[u8; 4]] = &[
    [0xFE, 0xED, 0xFA, 0xCE],
    [0xFE, 0xED, 0xFA, 0xCF],
    [0xCE, 0xFA, 0xED, 0xFE],
    [0xCF, 0xFA, 0xED, 0xFE],
    // Universal (fat) binaries.
    [0xCA, 0xFE, 0xBA, 0xBE],
];

/// Detect a content type from the leading bytes of a file.
pub fn detect_content_type(header: &[u8]) -> &'static str {
    if header.starts_with(b"\x7FELF") {
        return ELF_EXECUTABLE;
    }

    if header.starts_with(b"MZ") {
        return DOS_EXECUTABLE;
    }

    if MACH_MAGICS.iter().any(|magic| header.starts_with(magic)) {
        return MACH_BINARY;
    }

    // Anything else carrying NUL bytes is opaque binary data.
    if header.contains(&0) {
        return OCTET_STREAM;
    }

    PLAIN_TEXT
}

/// Reads the first bytes of `path` and detects its content type.
pub fn content_type_of(path: &Path) -> io::Result<&'static str> {
    let mut header = Vec::new();
    File::open(path)?
        .take(SNIFF_HEADER_LEN)
        .read_to_end(&mut header)?;
    Ok(detect_content_type(&header))
}

/// Whether `content_type` is one of [`EXECUTABLE_CONTENT_TYPES`].
pub fn is_executable_content_type(content_type: &str) -> bool {
    EXECUTABLE_CONTENT_TYPES.contains(&content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_elf() {
        let header = [0x7F, b'E', b'L', b'F', 2, 1, 1, 0];
        assert_eq!(detect_content_type(&header), ELF_EXECUTABLE);
    }

    #[test]
    fn test_detect_pe() {
        let mut header = vec![0u8; 64];
        header[0] = b'M';
        header[1] = b'Z';
        assert_eq!(detect_content_type(&header), DOS_EXECUTABLE);
    }

    #[test]
    fn test_detect_mach_o_and_fat() {
        assert_eq!(detect_content_type(&[0xCF, 0xFA, 0xED, 0xFE, 7, 0]), MACH_BINARY);
        assert_eq!(detect_content_type(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0]), MACH_BINARY);
    }

    #[test]
    fn test_detect_generic_binary_and_text() {
        assert_eq!(detect_content_type(b"abc\0def"), OCTET_STREAM);
        assert_eq!(detect_content_type(b"#!/bin/sh\necho hi\n"), PLAIN_TEXT);
        assert_eq!(detect_content_type(b""), PLAIN_TEXT);
    }

    #[test]
    fn test_accept_list() {
        assert!(is_executable_content_type(ELF_EXECUTABLE));
        assert!(is_executable_content_type(OCTET_STREAM));
        assert!(!is_executable_content_type(PLAIN_TEXT));
    }
}
