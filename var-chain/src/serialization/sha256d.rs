//! The double-SHA256 hash used to identify transactions and block headers.

use sha2::{Digest, Sha256};
use std::io;

/// A type that lets you write out SHA256d (double-SHA256, i.e.,
/// SHA256(SHA256(data))).
#[derive(Default)]
pub struct Writer {
    hash: Sha256,
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hash.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    /// Consume the Writer and produce the hash result.
    pub fn finish(self) -> [u8; 32] {
        let result1 = self.hash.finalize();
        let result2 = Sha256::digest(result1.as_slice());
        let mut buffer = [0u8; 32];
        buffer[0..32].copy_from_slice(&result2[0..32]);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256d_checksum() {
        // SHA256d("") = SHA256(SHA256(""))
        let mut writer = Writer::default();
        writer.write_all(b"").unwrap();
        let hash = writer.finish();
        assert_eq!(
            hex::encode(&hash),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
