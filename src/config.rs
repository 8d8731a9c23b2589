//! # Serial Link Configuration
//!
//! Settings for the serial side of the printer interface.
//!
//! | Setting | Default | Allowed |
//! |---------|---------|---------|
//! | `baud_rate` | 115200 | any non-zero rate the platform supports |
//! | `data_bits` | 8 | 5–8 |
//! | `stop_bits` | 1 | 1, 2 |
//! | `parity` | `none` | `none`, `even`, `odd` |
//! | `dtr` | `false` | DTR-handshake interface (TULIP4041) |
//!
//! Settings can be loaded from a JSON file; missing fields keep their
//! defaults:
//!
//! ```
//! use hp41print::config::{Parity, SerialConfig};
//!
//! let config = SerialConfig::from_json_str(r#"{ "baud_rate": 9600, "dtr": true }"#).unwrap();
//! assert_eq!(config.baud_rate, 9600);
//! assert_eq!(config.parity, Parity::None);
//! assert!(config.mode().is_dtr());
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decoder::Mode;
use crate::error::Hp41PrintError;

/// Baud rates offered by common USB serial adapters
pub const COMMON_BAUD_RATES: [u32; 13] = [
    300, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// # Serial Configuration
///
/// One connection's link settings plus the interface mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path; `None` picks the preferred discovered port
    pub device: Option<String>,

    pub baud_rate: u32,

    pub data_bits: u8,

    pub stop_bits: u8,

    pub parity: Parity,

    /// Assert DTR and decode with [`Mode::Dtr`] framing
    pub dtr: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: Self::DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            dtr: false,
        }
    }
}

impl SerialConfig {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Decoder mode for connections using this config.
    pub fn mode(&self) -> Mode {
        Mode::from_dtr(self.dtr)
    }

    /// Parse a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, Hp41PrintError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Hp41PrintError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Hp41PrintError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Reject settings no serial line can use.
    pub fn validate(&self) -> Result<(), Hp41PrintError> {
        if self.baud_rate == 0 {
            return Err(Hp41PrintError::Config("baud rate must be non-zero".to_string()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(Hp41PrintError::Config(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(Hp41PrintError::Config(format!(
                "stop bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }

    /// Whether the baud rate is one of [`COMMON_BAUD_RATES`].
    pub fn is_common_baud_rate(&self) -> bool {
        COMMON_BAUD_RATES.contains(&self.baud_rate)
    }
}
