//! Line reassembly across read boundaries
//!
//! Reads from a growing file end wherever the writer happened to be, so a
//! chunk may stop mid-line. The trailing partial line is held back and
//! prepended to the next chunk; it is never emitted on its own.

/// Accumulates raw chunks and yields complete lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    fragment: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completes
    ///
    /// Lines are returned without their `\n` or `\r\n` terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.fragment.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let mut raw = std::mem::take(&mut self.fragment);
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            lines.push(String::from_utf8_lossy(&raw).into_owned());
        }

        self.fragment.extend_from_slice(rest);
        lines
    }

    /// Drop any held-back fragment, used when the file is truncated
    pub fn reset(&mut self) {
        self.fragment.clear();
    }
}
