//! Tokenizer adapter over the cl100k_base BPE.
//!
//! Chunk sizes are measured in tokens, not characters, so the chunker and
//! anything downstream must agree on one encoding. The vocabulary ships
//! inside the tiktoken-rs crate; loading it never touches the network.

use anyhow::{Context, Result};
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::error::IngestError;

pub struct Tokenizer {
    bpe: CoreBPE,
}

impl Tokenizer {
    /// Load the cl100k_base vocabulary.
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base().context("failed to load cl100k_base tokenizer")?;
        Ok(Self { bpe })
    }

    /// Encode text to token ids. Special-token markers in scraped text are
    /// treated as ordinary text rather than rejected.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode token ids back to text. Fails when the ids do not decode to
    /// valid UTF-8, which can happen if a window boundary splits a
    /// multi-byte scalar.
    pub fn decode(&self, tokens: Vec<usize>) -> Result<String, IngestError> {
        self.bpe
            .decode(tokens)
            .map_err(|e| IngestError::Parse(format!("token decode: {}", e)))
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
