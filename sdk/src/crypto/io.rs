use {
    crate::crypto::Aes256CbcEnc,
    aes::cipher::{Block, BlockEncryptMut, block_padding::Pkcs7},
    std::io::{self, Write},
};

const BLOCK_LEN: usize = 16;

/// Encrypts everything written to it and forwards the ciphertext to the
/// inner writer.
///
/// Whole cipher blocks are encrypted and written out as soon as they are
/// available; only the sub-block remainder (at most 15 bytes) is carried
/// between writes, so memory use does not depend on the input size.
///
/// Dropping the writer without calling [`finish`](Self::finish) loses the
/// final padded block and produces an undecryptable file.
pub struct EncryptingWriter<W: Write> {
    cipher: Aes256CbcEnc,
    // Plaintext remainder, always shorter than one block between writes.
    buf: Vec<u8>,
    output: W,
}

impl<W: Write> EncryptingWriter<W> {
    pub(crate) fn new(cipher: Aes256CbcEnc, output: W) -> Self {
        Self {
            cipher,
            buf: Vec::new(),
            output,
        }
    }

    fn write_full_blocks(&mut self) -> io::Result<()> {
        let full_len = self.buf.len() - self.buf.len() % BLOCK_LEN;
        if full_len == 0 {
            return Ok(());
        }
        for chunk in self.buf[..full_len].chunks_exact_mut(BLOCK_LEN) {
            self.cipher
                .encrypt_block_mut(Block::<Aes256CbcEnc>::from_mut_slice(chunk));
        }
        self.output.write_all(&self.buf[..full_len])?;
        self.buf.drain(..full_len);
        Ok(())
    }

    /// Pads and writes the final block, flushes the inner writer and
    /// returns it.
    pub fn finish(mut self) -> io::Result<W> {
        self.write_full_blocks()?;
        let tail_len = self.buf.len();
        let mut tail = [0u8; BLOCK_LEN];
        tail[..tail_len].copy_from_slice(&self.buf);
        let ciphertext = self
            .cipher
            .encrypt_padded_mut::<Pkcs7>(&mut tail, tail_len)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "block padding failed"))?;
        self.output.write_all(ciphertext)?;
        self.output.flush()?;
        Ok(self.output)
    }
}

impl<W: Write> Write for EncryptingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        self.write_full_blocks()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
