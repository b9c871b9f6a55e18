//! EAP method selection.
//!
//! Decides which method the installer configures and the policy flags that
//! shape every artifact derived from it.

use std::str::FromStr;

use tracing::debug;

use crate::attributes::{ProfileAttributes, keys};
use crate::error::{GeneratorError, Result};
use crate::types::{EapMethod, OuterMethod, Platform};

/// Author identifier written for native TTLS.
pub const AUTHOR_ID_TTLS_NATIVE: u32 = 311;
/// Author identifier written for TTLS through the alternate supplicant.
pub const AUTHOR_ID_TTLS_ALTERNATE: u32 = 67532;

/// Outer identity sent instead of the real user name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousIdentity {
    local_part: String,
    realm: String,
}

impl AnonymousIdentity {
    pub fn new(local_part: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            local_part: local_part.into(),
            realm: realm.into(),
        }
    }

    /// The part before `@`. May be empty.
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// `<local-part>@<realm>`
    pub fn identity(&self) -> String {
        format!("{}@{}", self.local_part, self.realm)
    }
}

/// Resolved method and policy flags for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapSelection {
    pub platform: Platform,
    pub method: EapMethod,
    /// Present iff the profile overrides the outer identity.
    pub anonymous: Option<AnonymousIdentity>,
    /// Only ever true when the outer method is TTLS.
    pub use_alternate_supplicant: bool,
    pub wired: bool,
    /// TLS: let the user pick a different outer user name.
    pub tls_other_username: bool,
}

impl EapSelection {
    pub fn outer(&self) -> OuterMethod {
        self.method.outer()
    }

    pub fn use_anonymous_identity(&self) -> bool {
        self.anonymous.is_some()
    }

    /// Opaque author identifier for the EAP method header.
    pub fn author_id(&self) -> u32 {
        match (self.outer(), self.use_alternate_supplicant) {
            (OuterMethod::Ttls, true) => AUTHOR_ID_TTLS_ALTERNATE,
            (OuterMethod::Ttls, false) => AUTHOR_ID_TTLS_NATIVE,
            _ => 0,
        }
    }

    /// Method define handed to the packaging script.
    pub fn packaging_method_name(&self) -> &'static str {
        match self.outer() {
            OuterMethod::Tls => "TLS",
            OuterMethod::Peap => "PEAP",
            OuterMethod::Ttls if self.use_alternate_supplicant => "GEANTLink",
            OuterMethod::Ttls => "TTLS",
            OuterMethod::Pwd => "PWD",
        }
    }
}

/// Resolve the EAP method and flags from the attribute bag.
///
/// The method attribute lists methods in preference order; every entry must
/// parse and the first one wins.
///
/// # Errors
///
/// - `MissingAttribute` if no method is configured, or anonymous identity is
///   requested without its realm or local part
/// - `MalformedAttribute` if a method name cannot be parsed
pub fn select_method(attrs: &ProfileAttributes, platform: Platform) -> Result<EapSelection> {
    let method = resolve_method(attrs, platform)?;

    let anonymous = if attrs.is_enabled(keys::USE_ANON_OUTER) {
        let local_part = attrs.require_text(keys::ANON_LOCAL_VALUE, "anonymous identity")?;
        let realm = attrs.require_non_empty(keys::REALM, "anonymous identity")?;
        Some(AnonymousIdentity::new(local_part.trim(), realm.trim()))
    } else {
        None
    };

    let use_alternate_supplicant =
        method.outer() == OuterMethod::Ttls && attrs.is_enabled(keys::ALT_SUPPLICANT);

    let tls_other_username =
        method.outer() == OuterMethod::Tls && attrs.is_enabled(keys::TLS_USE_OTHER_ID);

    Ok(EapSelection {
        platform,
        method,
        anonymous,
        use_alternate_supplicant,
        wired: attrs.is_enabled(keys::WIRED),
        tls_other_username,
    })
}

fn resolve_method(attrs: &ProfileAttributes, platform: Platform) -> Result<EapMethod> {
    let methods = attrs
        .texts(keys::EAP_METHOD)
        .into_iter()
        .map(|name| {
            EapMethod::from_str(name.trim()).map_err(|_| {
                GeneratorError::malformed(keys::EAP_METHOD, format!("unknown EAP method '{}'", name))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("EAP method preference on {}: {:?}", platform, methods);

    // Every method installs on both platform variants
    methods
        .first()
        .copied()
        .ok_or_else(|| GeneratorError::missing(keys::EAP_METHOD, "EAP method selection"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    fn attrs_with_method(method: &str) -> ProfileAttributes {
        ProfileAttributes::new().with(keys::EAP_METHOD, AttributeValue::text(method))
    }

    #[test]
    fn test_missing_method_is_fatal() {
        let err = select_method(&ProfileAttributes::new(), Platform::W10).unwrap_err();
        assert!(matches!(err, GeneratorError::MissingAttribute { .. }));
    }

    #[test]
    fn test_unknown_method_is_malformed() {
        let err = select_method(&attrs_with_method("LEAP"), Platform::W10).unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedAttribute { .. }));
    }

    #[test]
    fn test_anonymous_identity_construction() {
        let attrs = attrs_with_method("TTLS-MSCHAPv2")
            .with(keys::USE_ANON_OUTER, AttributeValue::text("on"))
            .with(keys::ANON_LOCAL_VALUE, AttributeValue::text("anon"))
            .with(keys::REALM, AttributeValue::text("example.org"));
        let selection = select_method(&attrs, Platform::W10).expect("valid selection");
        let anon = selection.anonymous.expect("anonymous identity enabled");
        assert_eq!(anon.identity(), "anon@example.org");
    }

    #[test]
    fn test_anonymous_identity_requires_realm() {
        let attrs = attrs_with_method("PEAP-MSCHAPv2")
            .with(keys::USE_ANON_OUTER, AttributeValue::text("on"))
            .with(keys::ANON_LOCAL_VALUE, AttributeValue::text("anon"));
        let err = select_method(&attrs, Platform::W10).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::MissingAttribute { ref key, .. } if key == keys::REALM
        ));
    }

    #[test]
    fn test_empty_local_part_is_allowed() {
        let attrs = attrs_with_method("PEAP-MSCHAPv2")
            .with(keys::USE_ANON_OUTER, AttributeValue::text("on"))
            .with(keys::ANON_LOCAL_VALUE, AttributeValue::text(""))
            .with(keys::REALM, AttributeValue::text("example.org"));
        let selection = select_method(&attrs, Platform::W10).expect("valid selection");
        assert_eq!(selection.anonymous.map(|a| a.identity()), Some("@example.org".to_string()));
    }

    #[test]
    fn test_alternate_supplicant_only_for_ttls() {
        let peap = attrs_with_method("PEAP-MSCHAPv2")
            .with(keys::ALT_SUPPLICANT, AttributeValue::text("on"));
        assert!(!select_method(&peap, Platform::W10).unwrap().use_alternate_supplicant);

        let ttls = attrs_with_method("TTLS-PAP")
            .with(keys::ALT_SUPPLICANT, AttributeValue::text("on"));
        let selection = select_method(&ttls, Platform::W10).unwrap();
        assert!(selection.use_alternate_supplicant);
        assert_eq!(selection.author_id(), AUTHOR_ID_TTLS_ALTERNATE);
        assert_eq!(selection.packaging_method_name(), "GEANTLink");
    }

    #[test]
    fn test_author_ids() {
        let ttls = select_method(&attrs_with_method("TTLS-PAP"), Platform::W8).unwrap();
        assert_eq!(ttls.author_id(), AUTHOR_ID_TTLS_NATIVE);
        let tls = select_method(&attrs_with_method("TLS"), Platform::W8).unwrap();
        assert_eq!(tls.author_id(), 0);
    }

    #[test]
    fn test_unknown_later_method_is_malformed() {
        let attrs = attrs_with_method("TLS").with(keys::EAP_METHOD, AttributeValue::text("LEAP"));
        let err = select_method(&attrs, Platform::W8).unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedAttribute { .. }));
    }

    #[test]
    fn test_first_method_wins_on_both_platforms() {
        for platform in [Platform::W8, Platform::W10] {
            let attrs = attrs_with_method("TTLS-PAP").with(keys::EAP_METHOD, AttributeValue::text("TLS"));
            assert_eq!(select_method(&attrs, platform).unwrap().method, EapMethod::TtlsPap);
        }
    }

    #[test]
    fn test_first_method_wins() {
        let attrs = attrs_with_method("PWD").with(keys::EAP_METHOD, AttributeValue::text("TLS"));
        assert_eq!(select_method(&attrs, Platform::W10).unwrap().method, EapMethod::Pwd);
    }

    #[test]
    fn test_flags() {
        let attrs = attrs_with_method("TLS")
            .with(keys::TLS_USE_OTHER_ID, AttributeValue::text("on"))
            .with(keys::WIRED, AttributeValue::text("on"));
        let selection = select_method(&attrs, Platform::W10).unwrap();
        assert!(selection.tls_other_username);
        assert!(selection.wired);
        assert!(!selection.use_anonymous_identity());
    }
}
