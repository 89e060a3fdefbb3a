//! Application-visible parameters of the song burst service

use std::fmt;

use crate::error::ProfileError;

/// Length of the song data burst
pub const SONG_DATA_LEN: usize = 378;

/// Length of the configuration value
pub const SONG_CONFIG_LEN: usize = 2;

/// The two values the application can set and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// The 378-byte song data burst
    Data,
    /// The 2-byte configuration value
    Config,
}

impl Parameter {
    /// Numeric identifier used by the application interface
    pub const fn id(&self) -> u8 {
        match self {
            Parameter::Data => 0,
            Parameter::Config => 1,
        }
    }

    /// Exact length of the value behind this parameter
    pub const fn value_len(&self) -> usize {
        match self {
            Parameter::Data => SONG_DATA_LEN,
            Parameter::Config => SONG_CONFIG_LEN,
        }
    }
}

impl TryFrom<u8> for Parameter {
    type Error = ProfileError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Parameter::Data),
            1 => Ok(Parameter::Config),
            other => Err(ProfileError::UnknownParameter(other)),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Data => write!(f, "data"),
            Parameter::Config => write!(f, "config"),
        }
    }
}
