//! Reader registry
//!
//! Maps reader names (`code_128_reader`, or just `code_128`) to decoder
//! instances and resolves a configured list into an ordered [`DecoderSet`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::code39::Code39Reader;
use super::code128::Code128Reader;
use super::ean::EanReader;
use super::{SymbologyDecoder, error_rank};
use crate::error::{DecodeError, ScanError};
use crate::models::{BarPattern, CodeResult};

const READER_SUFFIX: &str = "_reader";

/// Strip the optional `_reader` suffix
fn canonical(name: &str) -> &str {
    name.strip_suffix(READER_SUFFIX).unwrap_or(name)
}

/// Named decoders available to a scanner.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn SymbologyDecoder>>,
}

impl ReaderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in reader.
    ///
    /// `code_128`, `ean` (EAN-13), `ean_8`, `upc` (UPC-A), `code_39` and
    /// `code_39_mod43`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, Arc<dyn SymbologyDecoder>); 6] = [
            ("code_128", Arc::new(Code128Reader::new())),
            ("ean", Arc::new(EanReader::ean13())),
            ("ean_8", Arc::new(EanReader::ean8())),
            ("upc", Arc::new(EanReader::upc_a())),
            ("code_39", Arc::new(Code39Reader::new())),
            ("code_39_mod43", Arc::new(Code39Reader::with_check_digit())),
        ];
        for (name, decoder) in builtins {
            registry.readers.insert(name.to_string(), decoder);
        }
        registry
    }

    /// Add a decoder under `name`.
    ///
    /// Fails with [`ScanError::DuplicateReader`] if the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        decoder: Arc<dyn SymbologyDecoder>,
    ) -> Result<(), ScanError> {
        let key = canonical(name);
        if self.readers.contains_key(key) {
            return Err(ScanError::DuplicateReader(name.to_string()));
        }
        self.readers.insert(key.to_string(), decoder);
        Ok(())
    }

    /// Look up a decoder by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn SymbologyDecoder>> {
        self.readers.get(canonical(name)).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.readers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve configured reader names, keeping their order.
    ///
    /// Repeated names are kept once. Fails on the first unknown name.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<DecoderSet, ScanError> {
        let mut decoders: Vec<(String, Arc<dyn SymbologyDecoder>)> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let key = canonical(name);
            let decoder = self
                .readers
                .get(key)
                .ok_or_else(|| ScanError::UnknownReader(name.to_string()))?;
            if decoders.iter().all(|(existing, _)| existing != key) {
                decoders.push((key.to_string(), Arc::clone(decoder)));
            }
        }
        Ok(DecoderSet { decoders })
    }
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("readers", &self.names())
            .finish()
    }
}

/// Ordered decoders tried against each bar pattern; first success wins.
#[derive(Clone, Default)]
pub struct DecoderSet {
    decoders: Vec<(String, Arc<dyn SymbologyDecoder>)>,
}

impl DecoderSet {
    /// Number of decoders
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// True when no decoder is enabled
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Reader names in trial order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decoders.iter().map(|(name, _)| name.as_str())
    }

    /// Try each decoder in order.
    ///
    /// On total failure, returns the error from the read that got furthest;
    /// ties go to the earlier decoder.
    pub fn decode(&self, pattern: &BarPattern) -> Result<CodeResult, DecodeError> {
        let mut failure: Option<DecodeError> = None;
        for (name, decoder) in &self.decoders {
            match decoder.decode(pattern) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    trace!(reader = %name, error = %err, "decoder rejected pattern");
                    let better = failure
                        .as_ref()
                        .is_none_or(|current| error_rank(&err) > error_rank(current));
                    if better {
                        failure = Some(err);
                    }
                }
            }
        }
        Err(failure.unwrap_or(DecodeError::NoStartPattern))
    }
}

impl std::fmt::Debug for DecoderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
