//! Certificate pinning for API TLS connections.
//!
//! Pinning only narrows an already-valid chain: the standard TLS checks
//! (hostname, expiry, trust path) run first, and the connection is then
//! rejected unless the chain is anchored at one of a known set of root
//! certificates. The decision itself is a pure function ([`validate`]) so the
//! acceptance matrix can be tested without a handshake; [`PinnedChainVerifier`]
//! wires it into rustls for real connections.

use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Marker separating certificate blocks in the embedded root bundle.
const CERT_DELIMITER: &str = "-----DUO_CERT-----";

/// The vendor root certificates, embedded at build time.
const BUNDLED_CA_CERTS: &str = include_str!("../resources/ca_certs.pem");

/// An immutable set of trusted root certificates, compared byte-exactly.
#[derive(Debug, Clone)]
pub struct RootCertificateSet {
    roots: Vec<CertificateDer<'static>>,
}

impl RootCertificateSet {
    /// The bundled vendor root set.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded bundle cannot be parsed; this
    /// indicates a defective build, not a caller mistake.
    pub fn bundled() -> Result<Self, ClientError> {
        Self::from_delimited_pem(BUNDLED_CA_CERTS)
    }

    /// Parse a text bundle of concatenated PEM certificates separated by the
    /// literal `-----DUO_CERT-----` marker. Empty and whitespace-only
    /// segments are discarded.
    pub fn from_delimited_pem(bundle: &str) -> Result<Self, ClientError> {
        let mut roots = Vec::new();
        for segment in bundle.split(CERT_DELIMITER) {
            if segment.trim().is_empty() {
                continue;
            }
            for cert in rustls_pemfile::certs(&mut segment.as_bytes()) {
                let cert =
                    cert.map_err(|e| ClientError::InvalidRootCertificate(e.to_string()))?;
                roots.push(cert);
            }
        }
        Ok(Self { roots })
    }

    /// Build a set from DER-encoded certificates.
    pub fn from_der(certs: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        Self {
            roots: certs.into_iter().collect(),
        }
    }

    /// Whether `cert` is present in the set, by exact byte comparison.
    #[must_use]
    pub fn contains(&self, cert: &CertificateDer<'_>) -> bool {
        self.roots
            .iter()
            .any(|root| bool::from(root.as_ref().ct_eq(cert.as_ref())))
    }

    /// The pinned root whose subject matches `cert`'s issuer, if any.
    #[must_use]
    pub fn issuer_of(&self, cert: &CertificateDer<'_>) -> Option<&CertificateDer<'static>> {
        let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref()).ok()?;
        let issuer = parsed.issuer().as_raw();
        self.roots.iter().find(|root| {
            x509_parser::parse_x509_certificate(root.as_ref())
                .is_ok_and(|(_, root)| root.subject().as_raw() == issuer)
        })
    }

    /// Number of roots in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Outcome of the standard TLS validation checks, prior to pinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyErrors {
    /// All standard checks passed.
    #[default]
    None,
    /// No server certificate was available.
    CertificateNotAvailable,
    /// The certificate does not match the requested hostname.
    NameMismatch,
    /// The chain failed validation (expiry, untrusted issuer, ...).
    ChainErrors,
}

/// Per-element status within a presented chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStatus {
    /// The element passed chain building.
    Ok,
    /// The element reported an error during chain building.
    Error,
}

/// One element of the server-presented certificate chain, leaf first.
#[derive(Debug)]
pub struct ChainElement<'a> {
    /// The DER-encoded certificate.
    pub certificate: &'a CertificateDer<'a>,
    /// Status reported for this element.
    pub status: ElementStatus,
}

/// Decide whether a server chain is acceptable under pinning.
///
/// Never fails; the result is only accept or reject:
///
/// 1. reject without a leaf certificate or a chain
/// 2. reject on any standard-validation failure
/// 3. reject if any chain element reports a non-OK status
/// 4. the last chain element is the candidate root; reject unless it
///    self-verifies
/// 5. reject unless the candidate root is pinned (byte-exact membership)
#[must_use]
pub fn validate(
    leaf: Option<&CertificateDer<'_>>,
    chain: Option<&[ChainElement<'_>]>,
    policy_errors: PolicyErrors,
    trusted_roots: &RootCertificateSet,
) -> bool {
    if leaf.is_none() {
        return false;
    }
    let Some(chain) = chain else {
        return false;
    };
    if policy_errors != PolicyErrors::None {
        return false;
    }
    if chain
        .iter()
        .any(|element| element.status != ElementStatus::Ok)
    {
        return false;
    }
    let Some(candidate) = chain.last() else {
        return false;
    };
    if !is_self_signed(candidate.certificate) {
        debug!("candidate root is not self-signed");
        return false;
    }
    trusted_roots.contains(candidate.certificate)
}

/// The disabled-validation decision: accept everything.
///
/// Debug builds only; constructing a client in this mode fails loudly in
/// release builds (see [`TrustMode::ensure_allowed`]).
#[must_use]
pub fn validate_disabled(
    _leaf: Option<&CertificateDer<'_>>,
    _chain: Option<&[ChainElement<'_>]>,
    _policy_errors: PolicyErrors,
) -> bool {
    true
}

/// Decide whether a chain as presented on the wire is acceptable under
/// pinning.
///
/// TLS servers routinely send only the leaf and intermediates, leaving the
/// root to be supplied from the verifier's own store. When the last
/// presented element is not itself pinned, the pinned set is searched for
/// that element's issuer and the matching root becomes the candidate; the
/// candidate still has to self-verify and be a byte-exact member of the set
/// (see [`validate`]). Standard validation failures must be gated before
/// this call via `policy_errors`.
#[must_use]
pub fn validate_presented(
    presented: &[&CertificateDer<'_>],
    policy_errors: PolicyErrors,
    trusted_roots: &RootCertificateSet,
) -> bool {
    let Some(&leaf) = presented.first() else {
        return false;
    };
    let mut chain: Vec<ChainElement<'_>> = presented
        .iter()
        .copied()
        .map(|certificate| ChainElement {
            certificate,
            status: ElementStatus::Ok,
        })
        .collect();
    let resolved = match presented.last() {
        Some(last) if !trusted_roots.contains(last) => trusted_roots.issuer_of(last),
        _ => None,
    };
    if let Some(certificate) = resolved {
        chain.push(ChainElement {
            certificate,
            status: ElementStatus::Ok,
        });
    }
    validate(Some(leaf), Some(&chain), policy_errors, trusted_roots)
}

/// Disabled-validation variant that still insists on a presented
/// certificate: chain, policy and pin checks are skipped, but a handshake
/// with no leaf at all is rejected.
#[must_use]
pub fn validate_disabled_requiring_certificate(
    leaf: Option<&CertificateDer<'_>>,
    _chain: Option<&[ChainElement<'_>]>,
    _policy_errors: PolicyErrors,
) -> bool {
    leaf.is_some()
}

/// Whether a certificate is self-issued and carries a valid self-signature.
fn is_self_signed(der: &CertificateDer<'_>) -> bool {
    match x509_parser::parse_x509_certificate(der.as_ref()) {
        Ok((_, cert)) => {
            cert.subject().as_raw() == cert.issuer().as_raw()
                && cert.verify_signature(None).is_ok()
        }
        Err(_) => false,
    }
}

/// How the client trusts server certificates. The modes are mutually
/// exclusive.
#[derive(Debug, Clone, Default)]
pub enum TrustMode {
    /// Pin to the bundled vendor root set.
    #[default]
    Bundled,
    /// Pin to a caller-supplied root set.
    Custom(RootCertificateSet),
    /// Accept any certificate. Debug builds only.
    Disabled,
}

impl TrustMode {
    /// Reject the disabled mode outside debug builds.
    pub(crate) fn ensure_allowed(&self) -> Result<(), ClientError> {
        if matches!(self, Self::Disabled) && !cfg!(debug_assertions) {
            return Err(ClientError::ValidationDisabledInRelease);
        }
        Ok(())
    }

    /// Build the rustls client configuration for this mode, or `None` when
    /// validation is disabled (the transport then uses its own
    /// accept-anything setting).
    pub(crate) fn tls_config(&self) -> Result<Option<rustls::ClientConfig>, ClientError> {
        let roots = match self {
            Self::Bundled => RootCertificateSet::bundled()?,
            Self::Custom(roots) => roots.clone(),
            Self::Disabled => {
                warn!("TLS certificate validation is disabled");
                return Ok(None);
            }
        };
        let verifier = PinnedChainVerifier::new(Arc::new(roots))?;
        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(Some(config))
    }
}

/// rustls server-certificate verifier that layers the pin decision over the
/// standard webpki validation.
#[derive(Debug)]
pub(crate) struct PinnedChainVerifier {
    webpki: Arc<WebPkiServerVerifier>,
    roots: Arc<RootCertificateSet>,
}

impl PinnedChainVerifier {
    pub(crate) fn new(roots: Arc<RootCertificateSet>) -> Result<Self, ClientError> {
        let mut store = RootCertStore::empty();
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let webpki = WebPkiServerVerifier::builder(Arc::new(store))
            .build()
            .map_err(|e| ClientError::Tls(e.to_string()))?;
        Ok(Self { webpki, roots })
    }
}

impl ServerCertVerifier for PinnedChainVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        // Standard validation first; pinning never overrides a failed check.
        self.webpki
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        let presented: Vec<&CertificateDer<'_>> = std::iter::once(end_entity)
            .chain(intermediates.iter())
            .collect();

        if validate_presented(&presented, PolicyErrors::None, &self.roots) {
            Ok(ServerCertVerified::assertion())
        } else {
            debug!("server chain is not anchored at a pinned root");
            Err(rustls::Error::General(
                "server chain is not anchored at a pinned root".to_owned(),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.webpki.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.webpki.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.webpki.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A self-contained root -> intermediate -> leaf chain for wire-shape
    // tests; the root is the only self-signed element.
    const CHAIN_ROOT: &str = include_str!("../testdata/root.pem");
    const CHAIN_INTERMEDIATE: &str = include_str!("../testdata/intermediate.pem");
    const CHAIN_LEAF: &str = include_str!("../testdata/leaf.pem");

    fn fixture_cert(pem: &str) -> CertificateDer<'static> {
        rustls_pemfile::certs(&mut pem.as_bytes())
            .next()
            .unwrap()
            .unwrap()
    }

    fn bundled_roots() -> RootCertificateSet {
        RootCertificateSet::bundled().unwrap()
    }

    fn chain_from<'a>(certs: &[&'a CertificateDer<'a>]) -> Vec<ChainElement<'a>> {
        certs
            .iter()
            .map(|certificate| ChainElement {
                certificate,
                status: ElementStatus::Ok,
            })
            .collect()
    }

    #[test]
    fn test_should_parse_ten_bundled_roots() {
        assert_eq!(bundled_roots().len(), 10);
    }

    #[test]
    fn test_should_discard_whitespace_segments_in_bundle() {
        let roots = RootCertificateSet::from_delimited_pem("\n  \n-----DUO_CERT-----\n\t\n")
            .unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn test_should_accept_valid_chain_with_pinned_root() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        let root = roots.roots[1].clone();
        let chain = chain_from(&[&leaf, &root]);
        assert!(validate(Some(&leaf), Some(&chain), PolicyErrors::None, &roots));
    }

    #[test]
    fn test_should_reject_missing_leaf() {
        let roots = bundled_roots();
        let root = roots.roots[0].clone();
        let chain = chain_from(&[&root]);
        assert!(!validate(None, Some(&chain), PolicyErrors::None, &roots));
    }

    #[test]
    fn test_should_reject_missing_chain() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        assert!(!validate(Some(&leaf), None, PolicyErrors::None, &roots));
    }

    #[test]
    fn test_should_reject_empty_chain() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        assert!(!validate(Some(&leaf), Some(&[]), PolicyErrors::None, &roots));
    }

    #[test]
    fn test_should_reject_any_policy_error() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        let root = roots.roots[1].clone();
        let chain = chain_from(&[&leaf, &root]);
        for errors in [
            PolicyErrors::CertificateNotAvailable,
            PolicyErrors::NameMismatch,
            PolicyErrors::ChainErrors,
        ] {
            assert!(!validate(Some(&leaf), Some(&chain), errors, &roots));
        }
    }

    #[test]
    fn test_should_reject_chain_element_with_error_status() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        let root = roots.roots[1].clone();
        let chain = vec![
            ChainElement {
                certificate: &leaf,
                status: ElementStatus::Error,
            },
            ChainElement {
                certificate: &root,
                status: ElementStatus::Ok,
            },
        ];
        assert!(!validate(Some(&leaf), Some(&chain), PolicyErrors::None, &roots));
    }

    #[test]
    fn test_should_reject_root_absent_from_pinned_set() {
        let all = bundled_roots();
        // Pin only the first root; present a chain anchored at a different one.
        let pinned = RootCertificateSet::from_der([all.roots[1].clone()]);
        let leaf = all.roots[2].clone();
        let root = all.roots[6].clone();
        let chain = chain_from(&[&leaf, &root]);
        assert!(!validate(Some(&leaf), Some(&chain), PolicyErrors::None, &pinned));
    }

    #[test]
    fn test_should_match_pinned_root_byte_exactly() {
        let roots = bundled_roots();
        let root = roots.roots[0].clone();
        assert!(roots.contains(&root));
        let truncated = CertificateDer::from(root.as_ref()[..root.as_ref().len() - 1].to_vec());
        assert!(!roots.contains(&truncated));
    }

    #[test]
    fn test_should_accept_everything_when_disabled() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        let chain = chain_from(&[&leaf]);
        assert!(validate_disabled(Some(&leaf), Some(&chain), PolicyErrors::None));
        assert!(validate_disabled(None, Some(&chain), PolicyErrors::None));
        assert!(validate_disabled(Some(&leaf), None, PolicyErrors::None));
        assert!(validate_disabled(
            Some(&leaf),
            Some(&chain),
            PolicyErrors::NameMismatch
        ));
    }

    #[test]
    fn test_should_accept_wire_chain_that_omits_the_pinned_root() {
        let root = fixture_cert(CHAIN_ROOT);
        let intermediate = fixture_cert(CHAIN_INTERMEDIATE);
        let leaf = fixture_cert(CHAIN_LEAF);
        let pinned = RootCertificateSet::from_der([root.clone()]);
        // Servers typically send leaf + intermediate only.
        assert!(validate_presented(
            &[&leaf, &intermediate],
            PolicyErrors::None,
            &pinned
        ));
        // A server that does include the root is accepted as well.
        assert!(validate_presented(
            &[&leaf, &intermediate, &root],
            PolicyErrors::None,
            &pinned
        ));
    }

    #[test]
    fn test_should_reject_wire_chain_whose_issuer_is_not_pinned() {
        let intermediate = fixture_cert(CHAIN_INTERMEDIATE);
        let leaf = fixture_cert(CHAIN_LEAF);
        let pinned = RootCertificateSet::from_der([bundled_roots().roots[1].clone()]);
        assert!(!validate_presented(
            &[&leaf, &intermediate],
            PolicyErrors::None,
            &pinned
        ));
    }

    #[test]
    fn test_should_gate_wire_chain_on_policy_errors() {
        let root = fixture_cert(CHAIN_ROOT);
        let intermediate = fixture_cert(CHAIN_INTERMEDIATE);
        let leaf = fixture_cert(CHAIN_LEAF);
        let pinned = RootCertificateSet::from_der([root]);
        assert!(!validate_presented(
            &[&leaf, &intermediate],
            PolicyErrors::ChainErrors,
            &pinned
        ));
        assert!(!validate_presented(&[], PolicyErrors::None, &pinned));
    }

    #[test]
    fn test_should_find_the_pinned_issuer_of_an_intermediate() {
        let root = fixture_cert(CHAIN_ROOT);
        let intermediate = fixture_cert(CHAIN_INTERMEDIATE);
        let leaf = fixture_cert(CHAIN_LEAF);
        let pinned = RootCertificateSet::from_der([root.clone()]);
        assert_eq!(pinned.issuer_of(&intermediate), Some(&root));
        // The leaf's issuer is the intermediate, which is not pinned.
        assert!(pinned.issuer_of(&leaf).is_none());
    }

    #[test]
    fn test_should_still_require_a_leaf_in_the_strict_disabled_variant() {
        let roots = bundled_roots();
        let leaf = roots.roots[0].clone();
        assert!(validate_disabled_requiring_certificate(
            Some(&leaf),
            None,
            PolicyErrors::ChainErrors
        ));
        assert!(!validate_disabled_requiring_certificate(
            None,
            None,
            PolicyErrors::None
        ));
    }

    #[test]
    fn test_should_allow_disabled_mode_only_in_debug_builds() {
        let result = TrustMode::Disabled.ensure_allowed();
        if cfg!(debug_assertions) {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(ClientError::ValidationDisabledInRelease)
            ));
        }
    }

    #[test]
    fn test_should_build_tls_config_for_bundled_mode() {
        let config = TrustMode::Bundled.tls_config().unwrap();
        assert!(config.is_some());
    }

    #[test]
    fn test_should_not_build_tls_config_for_disabled_mode() {
        let config = TrustMode::Disabled.tls_config().unwrap();
        assert!(config.is_none());
    }
}
