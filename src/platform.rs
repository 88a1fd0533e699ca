//! Platform identities and phone-number normalization
//!
//! Every inbound channel resolves to a canonical user id before the core
//! sees the message: web users keep their email, WhatsApp users become the
//! full 12-digit number, Telegram users become `telegram_<chat_id>`, and
//! SMS users become `sms_<full number>`.

use serde::{Deserialize, Serialize};

/// Country calling code used when canonicalizing bare national numbers
pub const COUNTRY_CODE: &str = "91";

/// Originating platform of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    WhatsApp,
    Telegram,
    Sms,
}

impl Platform {
    /// Tag persisted with turn records and used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::WhatsApp => "whatsapp",
            Platform::Telegram => "telegram",
            Platform::Sms => "sms",
        }
    }

    /// All platforms, in display order
    pub fn all() -> [Platform; 4] {
        [
            Platform::Web,
            Platform::WhatsApp,
            Platform::Telegram,
            Platform::Sms,
        ]
    }

    /// Identify the platform a user id was minted by
    pub fn identify(user_id: &str) -> Option<Platform> {
        if user_id.starts_with("telegram_") {
            Some(Platform::Telegram)
        } else if user_id.starts_with("sms_") {
            Some(Platform::Sms)
        } else if user_id.starts_with(COUNTRY_CODE)
            && user_id.len() == 12
            && user_id.chars().all(|c| c.is_ascii_digit())
        {
            Some(Platform::WhatsApp)
        } else if user_id.contains('@') {
            Some(Platform::Web)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a phone-number-like string to a bare 10-digit national number
///
/// Strips every non-digit, then accepts:
/// - 12 digits with the country code prefix (prefix removed)
/// - 11 digits with a leading trunk `0` (zero removed)
/// - exactly 10 digits
///
/// Anything else is rejected.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with(COUNTRY_CODE) {
        Some(digits[COUNTRY_CODE.len()..].to_string())
    } else if digits.len() == 11 && digits.starts_with('0') {
        Some(digits[1..].to_string())
    } else if digits.len() == 10 {
        Some(digits)
    } else {
        None
    }
}

/// Canonical full number: country code + 10-digit national number
pub fn full_number(national: &str) -> String {
    format!("{COUNTRY_CODE}{national}")
}
