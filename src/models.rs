use std::fmt;

use serde::{Deserialize, Serialize};

/// How a number is used by the telephony side: voice routing or OTP delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhoneMode {
    #[default]
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "OTP")]
    Otp,
}

impl PhoneMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Otp => "OTP",
        }
    }

    /// Strict parse; anything other than the two wire spellings is rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CALL" => Some(Self::Call),
            "OTP" => Some(Self::Otp),
            _ => None,
        }
    }
}

impl fmt::Display for PhoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
