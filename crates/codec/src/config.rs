//! Envelope configuration via `envelope.toml`
//!
//! Selects the wire format, the subtype tag strategy and whether the
//! built-in contracts are registered. Contracts themselves are always
//! registered in code.

use crate::format::{BincodeFormat, MessagePackFormat, WireFormat, DEFAULT_DECODE_LIMIT};
use crate::subtype::{HashDerivedTags, SequentialTags, TagAllocator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strata_core::error::{Error, Result};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "envelope.toml";

/// Envelope configuration loaded from `envelope.toml`.
///
/// # Example
///
/// ```toml
/// # Wire format: "bincode" (default) or "msgpack"
/// format = "bincode"
///
/// # Subtype tags: "sequential" (default) or "hash"
/// tag_strategy = "sequential"
///
/// # Most bytes one payload decode may consume
/// max_decode_bytes = 16777216
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Wire format: `"bincode"` or `"msgpack"`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Subtype tag strategy: `"sequential"` or `"hash"`.
    #[serde(default = "default_tag_strategy")]
    pub tag_strategy: String,
    /// Register the built-in contracts at bootstrap.
    #[serde(default = "default_register_builtins")]
    pub register_builtins: bool,
    /// Most bytes a single wire-format decode may consume.
    #[serde(default = "default_max_decode_bytes")]
    pub max_decode_bytes: u64,
}

fn default_format() -> String {
    BincodeFormat::NAME.to_string()
}

fn default_tag_strategy() -> String {
    "sequential".to_string()
}

fn default_register_builtins() -> bool {
    true
}

fn default_max_decode_bytes() -> u64 {
    DEFAULT_DECODE_LIMIT
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            tag_strategy: default_tag_strategy(),
            register_builtins: default_register_builtins(),
            max_decode_bytes: default_max_decode_bytes(),
        }
    }
}

impl EnvelopeConfig {
    /// Check every field names something that exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        match self.format.as_str() {
            f if f == BincodeFormat::NAME || f == MessagePackFormat::NAME => {}
            other => {
                return Err(Error::InvalidConfig(format!(
                    "Invalid format '{}' in {}. Expected \"bincode\" or \"msgpack\".",
                    other, CONFIG_FILE_NAME
                )))
            }
        }
        if self.max_decode_bytes == 0 {
            return Err(Error::InvalidConfig(format!(
                "Invalid max_decode_bytes 0 in {}. Expected a positive byte count.",
                CONFIG_FILE_NAME
            )));
        }
        self.tag_allocator().map(|_| ())
    }

    /// Build the configured tag allocator.
    pub fn tag_allocator(&self) -> Result<Box<dyn TagAllocator>> {
        match self.tag_strategy.as_str() {
            "sequential" => Ok(Box::new(SequentialTags::new())),
            "hash" => Ok(Box::new(HashDerivedTags)),
            other => Err(Error::InvalidConfig(format!(
                "Invalid tag_strategy '{}' in {}. Expected \"sequential\" or \"hash\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata envelope configuration
#
# Wire format: "bincode" (default) or "msgpack"
#   Producer and consumer must agree; the envelope header does not record it.
format = "bincode"

# Subtype tag strategy: "sequential" (default) or "hash"
#   "sequential" = 1, 2, 3... per base in registration order
#   "hash"       = derived from the contract identity, order-independent
tag_strategy = "sequential"

# Register Commit, event record lists, string maps and failure reports
register_builtins = true

# Most bytes one payload decode may consume (default 16 MiB)
#   A length prefix on the wire claiming more is rejected as corrupt.
max_decode_bytes = 16777216
"#
    }

    /// Parse and validate config text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EnvelopeConfig = toml::from_str(content).map_err(|e| {
            Error::InvalidConfig(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }
}
