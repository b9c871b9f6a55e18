//! EAP configuration composer.
//!
//! Builds the `EapHostConfig` block embedded in every WLAN and LAN profile.
//! Each branch is a function of immutable inputs returning its own XML; the
//! caller concatenates header, body and footer.
//!
//! | Branch         | Server validation                         | Identity                     |
//! |----------------|-------------------------------------------|------------------------------|
//! | TLS            | server names + root SHA-1 (plain hex)     | optional different user name |
//! | PEAP           | same as TLS, one level deeper             | anonymous user name          |
//! | TTLS native    | server names + root SHA-1 (chunked hex)   | anonymous identity           |
//! | TTLS alternate | base64 DER bodies + server name elements  | anonymous identity           |
//! | PWD            | none                                      | none                         |

use crate::certificate::{self, CertificateAuthority};
use crate::engine::selector::EapSelection;
use crate::engine::xml_escape;
use crate::error::BuildWarning;
use crate::types::{InnerMethod, OuterMethod};

const NS_EAP_HOST: &str = "http://www.microsoft.com/provisioning/EapHostConfig";
const NS_EAP_COMMON: &str = "http://www.microsoft.com/provisioning/EapCommon";
const NS_BASE_EAP: &str = "http://www.microsoft.com/provisioning/BaseEapConnectionPropertiesV1";

/// Target embedding of the EAP configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Representation {
    /// `EAPConfig/EapHostConfig`, embedded in native WLAN and LAN profiles.
    EapHost,
}

/// Which composer produces the body for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerBranch {
    Tls,
    Peap,
    TtlsNative,
    TtlsAlternate,
    Pwd,
}

impl ComposerBranch {
    pub fn for_selection(selection: &EapSelection) -> Self {
        match selection.outer() {
            OuterMethod::Tls => Self::Tls,
            OuterMethod::Peap => Self::Peap,
            OuterMethod::Ttls if selection.use_alternate_supplicant => Self::TtlsAlternate,
            OuterMethod::Ttls => Self::TtlsNative,
            OuterMethod::Pwd => Self::Pwd,
        }
    }
}

/// Everything the composer reads.
#[derive(Debug, Clone)]
pub struct EapConfigInputs<'a> {
    pub selection: &'a EapSelection,
    pub certificates: &'a [CertificateAuthority],
    pub server_names: &'a [String],
    /// Institution display name, already translated.
    pub display_name: &'a str,
    /// Provider identifier (UUID) for the alternate supplicant.
    pub provider_id: &'a str,
}

/// One serialized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapConfigBlock {
    pub representation: Representation,
    pub xml: String,
}

/// Composer output.
#[derive(Debug, Clone, Default)]
pub struct ComposedEapConfig {
    pub blocks: Vec<EapConfigBlock>,
    pub warnings: Vec<BuildWarning>,
}

impl ComposedEapConfig {
    pub fn block(&self, representation: Representation) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| b.representation == representation)
            .map(|b| b.xml.as_str())
    }
}

/// Compose one block per requested representation.
///
/// A method that validates the server but has no root-marked CA still gets a
/// (empty) validation block; the condition is reported as a warning.
pub fn compose(inputs: &EapConfigInputs<'_>, representations: &[Representation]) -> ComposedEapConfig {
    let mut warnings = Vec::new();
    let outer = inputs.selection.outer();
    if outer.validates_server() && certificate::roots(inputs.certificates).next().is_none() {
        tracing::warn!(
            "{} validates the server but no root CA is configured",
            inputs.selection.method
        );
        warnings.push(BuildWarning::NoRootCertificate {
            method: inputs.selection.method.to_string(),
        });
    }

    let blocks = representations
        .iter()
        .map(|&representation| EapConfigBlock {
            representation,
            xml: match representation {
                Representation::EapHost => eap_host_config(inputs),
            },
        })
        .collect();

    ComposedEapConfig { blocks, warnings }
}

fn eap_host_config(inputs: &EapConfigInputs<'_>) -> String {
    let body = match ComposerBranch::for_selection(inputs.selection) {
        ComposerBranch::Tls => tls_config(inputs),
        ComposerBranch::Peap => peap_config(inputs),
        ComposerBranch::TtlsNative => ttls_native_config(inputs),
        ComposerBranch::TtlsAlternate => ttls_alternate_config(inputs),
        ComposerBranch::Pwd => pwd_config(),
    };
    format!(
        "{}{}</EapHostConfig></EAPConfig>",
        eap_config_header(inputs.selection),
        body
    )
}

fn eap_config_header(selection: &EapSelection) -> String {
    format!(
        "<EAPConfig><EapHostConfig xmlns=\"{NS_EAP_HOST}\">\n\
         <EapMethod>\n\
         <Type xmlns=\"{NS_EAP_COMMON}\">{}</Type>\n\
         <VendorId xmlns=\"{NS_EAP_COMMON}\">0</VendorId>\n\
         <VendorType xmlns=\"{NS_EAP_COMMON}\">0</VendorType>\n\
         <AuthorId xmlns=\"{NS_EAP_COMMON}\">{}</AuthorId>\n\
         </EapMethod>\n",
        selection.outer().eap_type(),
        selection.author_id()
    )
}

fn joined_server_names(inputs: &EapConfigInputs<'_>) -> String {
    xml_escape(&inputs.server_names.join(";"))
}

fn tls_server_validation(inputs: &EapConfigInputs<'_>) -> String {
    let mut out = String::from(
        "<eapTls:ServerValidation>\n\
         <eapTls:DisableUserPromptForServerValidation>true</eapTls:DisableUserPromptForServerValidation>\n",
    );
    out.push_str(&format!(
        "<eapTls:ServerNames>{}</eapTls:ServerNames>\n",
        joined_server_names(inputs)
    ));
    for ca in certificate::roots(inputs.certificates) {
        out.push_str(&format!("<eapTls:TrustedRootCA>{}</eapTls:TrustedRootCA>\n", ca.sha1_plain()));
    }
    out.push_str("</eapTls:ServerValidation>\n");
    out
}

fn tls_config(inputs: &EapConfigInputs<'_>) -> String {
    format!(
        "<Config xmlns:baseEap=\"{NS_BASE_EAP}\" \
         xmlns:eapTls=\"http://www.microsoft.com/provisioning/EapTlsConnectionPropertiesV1\">\n\
         <baseEap:Eap>\n\
         <baseEap:Type>13</baseEap:Type>\n\
         <eapTls:EapType>\n\
         <eapTls:CredentialsSource>\n\
         <eapTls:CertificateStore />\n\
         </eapTls:CredentialsSource>\n\
         {}\
         <eapTls:DifferentUsername>{}</eapTls:DifferentUsername>\n\
         </eapTls:EapType>\n\
         </baseEap:Eap>\n\
         </Config>\n",
        tls_server_validation(inputs),
        inputs.selection.tls_other_username
    )
}

fn peap_server_validation(inputs: &EapConfigInputs<'_>) -> String {
    let mut out = String::from(
        "<ServerValidation>\n\
         <DisableUserPromptForServerValidation>true</DisableUserPromptForServerValidation>\n",
    );
    out.push_str(&format!("<ServerNames>{}</ServerNames>\n", joined_server_names(inputs)));
    for ca in certificate::roots(inputs.certificates) {
        out.push_str(&format!("<TrustedRootCA>{}</TrustedRootCA>\n", ca.sha1_plain()));
    }
    out.push_str("</ServerValidation>\n");
    out
}

fn peap_identity_privacy(inputs: &EapConfigInputs<'_>) -> String {
    let Some(anon) = &inputs.selection.anonymous else {
        return String::new();
    };
    let user_name = if anon.local_part().is_empty() {
        "<AnonymousUserName/>\n".to_string()
    } else {
        format!("<AnonymousUserName>{}</AnonymousUserName>\n", xml_escape(anon.local_part()))
    };
    format!(
        "<PeapExtensions>\n\
         <IdentityPrivacy xmlns=\"http://www.microsoft.com/provisioning/MsPeapConnectionPropertiesV2\">\n\
         <EnableIdentityPrivacy>true</EnableIdentityPrivacy>\n\
         {user_name}\
         </IdentityPrivacy>\n\
         </PeapExtensions>\n"
    )
}

fn peap_config(inputs: &EapConfigInputs<'_>) -> String {
    format!(
        "<Config xmlns=\"{NS_EAP_HOST}\">\n\
         <Eap xmlns=\"{NS_BASE_EAP}\">\n\
         <Type>25</Type>\n\
         <EapType xmlns=\"http://www.microsoft.com/provisioning/MsPeapConnectionPropertiesV1\">\n\
         {}\
         <FastReconnect>true</FastReconnect>\n\
         <InnerEapOptional>false</InnerEapOptional>\n\
         <Eap xmlns=\"{NS_BASE_EAP}\">\n\
         <Type>26</Type>\n\
         <EapType xmlns=\"http://www.microsoft.com/provisioning/MsChapV2ConnectionPropertiesV1\">\n\
         <UseWinLogonCredentials>false</UseWinLogonCredentials>\n\
         </EapType>\n\
         </Eap>\n\
         <EnableQuarantineChecks>{}</EnableQuarantineChecks>\n\
         <RequireCryptoBinding>false</RequireCryptoBinding>\n\
         {}\
         </EapType>\n\
         </Eap>\n\
         </Config>\n",
        peap_server_validation(inputs),
        inputs.selection.wired,
        peap_identity_privacy(inputs)
    )
}

fn ttls_native_server_validation(inputs: &EapConfigInputs<'_>) -> String {
    let mut out = String::from("<ServerValidation>\n");
    out.push_str(&format!("<ServerNames>{}</ServerNames>\n", joined_server_names(inputs)));
    for ca in certificate::roots(inputs.certificates) {
        out.push_str(&format!("<TrustedRootCAHash>{}</TrustedRootCAHash>\n", ca.sha1_chunked()));
    }
    out.push_str("<DisablePrompt>true</DisablePrompt>\n</ServerValidation>\n");
    out
}

fn ttls_phase2(inner: InnerMethod) -> &'static str {
    match inner {
        InnerMethod::Pap => "<PAPAuthentication />\n",
        InnerMethod::MsChapV2 => {
            "<MSCHAPv2Authentication>\n\
             <UseWinlogonCredentials>false</UseWinlogonCredentials>\n\
             </MSCHAPv2Authentication>\n"
        }
        InnerMethod::None => "",
    }
}

fn ttls_native_config(inputs: &EapConfigInputs<'_>) -> String {
    let phase1 = match &inputs.selection.anonymous {
        Some(anon) => format!(
            "<IdentityPrivacy>true</IdentityPrivacy>\n\
             <AnonymousIdentity>{}</AnonymousIdentity>\n",
            xml_escape(&anon.identity())
        ),
        None => "<IdentityPrivacy>false</IdentityPrivacy>\n".to_string(),
    };
    format!(
        "<Config xmlns=\"{NS_EAP_HOST}\">\n\
         <EapTtls xmlns=\"http://www.microsoft.com/provisioning/EapTtlsConnectionPropertiesV1\">\n\
         {}\
         <Phase2Authentication>\n\
         {}\
         </Phase2Authentication>\n\
         <Phase1Identity>\n\
         {phase1}\
         </Phase1Identity>\n\
         </EapTtls>\n\
         </Config>\n",
        ttls_native_server_validation(inputs),
        ttls_phase2(inputs.selection.method.inner())
    )
}

fn ttls_alternate_server_validation(inputs: &EapConfigInputs<'_>) -> String {
    let mut out = String::from("<ServerSideCredential>\n");
    for ca in inputs.certificates {
        out.push_str(&format!(
            "<CA><format>PEM</format><cert-data>{}</cert-data></CA>\n",
            ca.der_base64()
        ));
    }
    for name in inputs.server_names {
        out.push_str(&format!("<ServerName>{}</ServerName>\n", xml_escape(name)));
    }
    out.push_str("</ServerSideCredential>\n");
    out
}

fn ttls_alternate_config(inputs: &EapConfigInputs<'_>) -> String {
    let anonymous = match &inputs.selection.anonymous {
        Some(anon) if anon.local_part().is_empty() => "<AnonymousIdentity>@</AnonymousIdentity>\n".to_string(),
        Some(anon) => format!(
            "<AnonymousIdentity>{}</AnonymousIdentity>\n",
            xml_escape(&anon.identity())
        ),
        None => String::new(),
    };
    format!(
        "<Config xmlns=\"{NS_EAP_HOST}\">\n\
         <EAPIdentityProviderList xmlns=\"urn:ietf:params:xml:ns:yang:ietf-eap-metadata\">\n\
         <EAPIdentityProvider ID=\"{}\" namespace=\"urn:UUID\">\n\
         <ProviderInfo>\n\
         <DisplayName>{}</DisplayName>\n\
         </ProviderInfo>\n\
         <AuthenticationMethods>\n\
         <AuthenticationMethod>\n\
         <EAPMethod>21</EAPMethod>\n\
         <ClientSideCredential>\n\
         <allow-save>true</allow-save>\n\
         {anonymous}\
         </ClientSideCredential>\n\
         {}\
         <InnerAuthenticationMethod>\n\
         <NonEAPAuthMethod>{}</NonEAPAuthMethod>\n\
         </InnerAuthenticationMethod>\n\
         <VendorSpecific>\n\
         <SessionResumption>false</SessionResumption>\n\
         </VendorSpecific>\n\
         </AuthenticationMethod>\n\
         </AuthenticationMethods>\n\
         </EAPIdentityProvider>\n\
         </EAPIdentityProviderList>\n\
         </Config>\n",
        xml_escape(inputs.provider_id),
        xml_escape(inputs.display_name),
        ttls_alternate_server_validation(inputs),
        inputs.selection.method.inner_display_name()
    )
}

fn pwd_config() -> String {
    "<ConfigBlob></ConfigBlob>".to_string()
}
