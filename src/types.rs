//! Type-safe vocabulary for installer generation.
//!
//! Platform variants, EAP methods and WLAN security settings are closed sets;
//! they are enums here so that every consumer matches them exhaustively.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Target platform variant.
///
/// Both variants share the packaging logic; only W10 enumerates Passpoint
/// roaming consortium profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[strum(serialize = "w8")]
    W8,
    #[default]
    #[strum(serialize = "w10")]
    W10,
}

impl Platform {
    /// Whether this variant writes Hotspot2 profiles for consortium OIs.
    pub fn supports_passpoint(self) -> bool {
        matches!(self, Self::W10)
    }

    /// Packaging defines identifying the platform.
    pub fn defines(self) -> &'static [&'static str] {
        match self {
            Self::W8 => &["W8"],
            Self::W10 => &["W8", "W10"],
        }
    }
}

/// Outer (tunnel) EAP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum OuterMethod {
    #[strum(serialize = "TLS")]
    Tls,
    #[strum(serialize = "PEAP")]
    Peap,
    #[strum(serialize = "TTLS")]
    Ttls,
    #[strum(serialize = "PWD")]
    Pwd,
}

impl OuterMethod {
    /// IANA EAP type number.
    pub const fn eap_type(self) -> u8 {
        match self {
            Self::Tls => 13,
            Self::Ttls => 21,
            Self::Peap => 25,
            Self::Pwd => 52,
        }
    }

    /// Whether the method pins the RADIUS server through a CA list.
    pub const fn validates_server(self) -> bool {
        !matches!(self, Self::Pwd)
    }
}

/// Inner authentication carried inside the tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum InnerMethod {
    #[strum(serialize = "NONE")]
    None,
    #[strum(serialize = "MSCHAPv2")]
    MsChapV2,
    #[strum(serialize = "PAP")]
    Pap,
}

/// The closed set of installable EAP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum EapMethod {
    #[strum(serialize = "TLS")]
    Tls,
    #[strum(serialize = "PEAP-MSCHAPv2")]
    PeapMschapv2,
    #[strum(serialize = "TTLS-PAP")]
    TtlsPap,
    #[strum(serialize = "TTLS-MSCHAPv2")]
    TtlsMschapv2,
    #[strum(serialize = "PWD")]
    Pwd,
    /// TLS with a provisioned client certificate.
    #[strum(serialize = "SILVERBULLET")]
    SilverBullet,
}

impl EapMethod {
    pub const fn outer(self) -> OuterMethod {
        match self {
            Self::Tls | Self::SilverBullet => OuterMethod::Tls,
            Self::PeapMschapv2 => OuterMethod::Peap,
            Self::TtlsPap | Self::TtlsMschapv2 => OuterMethod::Ttls,
            Self::Pwd => OuterMethod::Pwd,
        }
    }

    pub const fn inner(self) -> InnerMethod {
        match self {
            Self::Tls | Self::SilverBullet | Self::Pwd => InnerMethod::None,
            Self::PeapMschapv2 | Self::TtlsMschapv2 => InnerMethod::MsChapV2,
            Self::TtlsPap => InnerMethod::Pap,
        }
    }

    /// Whether the installer must ship a client certificate.
    pub const fn needs_client_certificate(self) -> bool {
        matches!(self, Self::SilverBullet)
    }

    /// Display name of the inner method, as shown to supplicants.
    pub fn inner_display_name(self) -> String {
        self.inner().to_string()
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// WLAN authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum AuthMode {
    #[strum(serialize = "WPA")]
    Wpa,
    #[strum(serialize = "WPA2")]
    Wpa2,
}

/// WLAN cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Cipher {
    #[strum(serialize = "TKIP")]
    Tkip,
    #[strum(serialize = "AES")]
    Aes,
}

/// How an SSID marked for removal is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum RemovalMarker {
    /// Remove the profile named after the SSID.
    #[strum(serialize = "DEL")]
    Delete,
    /// Remove only the transitional TKIP profile.
    #[strum(serialize = "TKIP")]
    Tkip,
}
