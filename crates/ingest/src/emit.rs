use std::io::{self, Stdout, Write};

use logship_core::error::{LogshipError, Result};
use logship_core::model::event::StructuredEvent;

/// Writes structured events as newline-delimited JSON.
pub struct Emitter<W: Write> {
    out: W,
    written: usize,
}

impl Emitter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn emit(&mut self, event: &StructuredEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)
            .map_err(|e| LogshipError::Io(format!("failed writing event: {e}")))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
