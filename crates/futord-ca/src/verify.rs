//! Certificate parsing and consumer-side verification.
//!
//! Consumers of a key directory should accept a certificate only if
//! 1. its signature verifies under `root.pub`,
//! 2. its Common Name equals its own file name, and
//! 3. for a released pair, the private key matches the certificate.
//!
//! Issuance never checks any of this on its own; these helpers are for
//! the distribution side and for the CLI.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use x509_parser::certificate::X509Certificate;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::AttributeTypeAndValue;

use crate::directory::{self, KeyDirectory};
use crate::keygen::RsaKey;
use crate::naming::{common_name_for, KeyPairNames};
use crate::subject::SubjectName;
use crate::{CaError, Result};

/// A DER certificate read from a PEM file.
#[derive(Debug, Clone)]
pub struct CertificateFile {
    der: Vec<u8>,
    path: PathBuf,
}

/// Fields of a certificate that passed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCertificate {
    /// Subject CN
    pub common_name: String,
    /// Subject O
    pub organization: String,
    /// Subject OU
    pub organizational_unit: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Serial number, lowercase hex
    pub serial: String,
    /// Start of validity
    pub not_before: DateTime<Utc>,
    /// End of validity
    pub not_after: DateTime<Utc>,
}

impl CertificateFile {
    /// Read the first certificate in a PEM file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_pem(&directory::read_text(path)?, path)
    }

    /// Take the first certificate in PEM text that came from `path`.
    pub fn from_pem(text: &str, path: &Path) -> Result<Self> {
        let blocks = pem::parse_many(text).map_err(|e| {
            CaError::Verification(format!("{}: not PEM: {e}", path.display()))
        })?;
        let block = blocks
            .into_iter()
            .find(|p| p.tag() == "CERTIFICATE")
            .ok_or_else(|| {
                CaError::Verification(format!("{}: no certificate found", path.display()))
            })?;

        let cert = Self {
            der: block.into_contents(),
            path: path.to_path_buf(),
        };
        cert.parse()?;
        Ok(cert)
    }

    /// Where the certificate was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    fn parse(&self) -> Result<X509Certificate<'_>> {
        x509_parser::parse_x509_certificate(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| {
                CaError::Verification(format!("{}: bad certificate: {e}", self.path.display()))
            })
    }

    /// Subject O / OU / CN.
    pub fn subject(&self) -> Result<SubjectName> {
        let cert = self.parse()?;
        let subject = cert.subject();
        Ok(SubjectName {
            organization: first_value(subject.iter_organization()),
            organizational_unit: first_value(subject.iter_organizational_unit()),
            common_name: first_value(subject.iter_common_name()),
        })
    }

    /// Certificate fields, without checking any signature.
    pub fn describe(&self) -> Result<VerifiedCertificate> {
        let subject = self.subject()?;
        let cert = self.parse()?;
        Ok(VerifiedCertificate {
            common_name: subject.common_name,
            organization: subject.organization,
            organizational_unit: subject.organizational_unit,
            issuer: cert.issuer().to_string(),
            serial: serial_hex(cert.raw_serial()),
            not_before: asn1_to_utc(cert.validity().not_before),
            not_after: asn1_to_utc(cert.validity().not_after),
        })
    }

    /// End of the validity window, as the signing engine represents it.
    pub fn not_after(&self) -> Result<time::OffsetDateTime> {
        Ok(self.parse()?.validity().not_after.to_datetime())
    }

    /// Check this certificate was signed by `issuer`.
    pub fn verify_signed_by(&self, issuer: &Self) -> Result<VerifiedCertificate> {
        let cert = self.parse()?;
        let anchor = issuer.parse()?;

        cert.verify_signature(Some(anchor.public_key())).map_err(|e| {
            CaError::Verification(format!(
                "{} is not signed by {}: {e}",
                self.path.display(),
                issuer.path.display()
            ))
        })?;

        let issuer_name = cert.issuer().to_string();
        let anchor_name = anchor.subject().to_string();
        if issuer_name != anchor_name {
            return Err(CaError::Verification(format!(
                "{} names issuer {issuer_name:?}, trust anchor is {anchor_name:?}",
                self.path.display()
            )));
        }

        self.describe()
    }

    /// Big-endian RSA modulus of the certified key.
    pub fn rsa_modulus(&self) -> Result<Vec<u8>> {
        let cert = self.parse()?;
        match cert.public_key().parsed() {
            Ok(PublicKey::RSA(rsa)) => Ok(trim_leading_zeros(rsa.modulus).to_vec()),
            Ok(_) => Err(CaError::Verification(format!(
                "{}: certified key is not RSA",
                self.path.display()
            ))),
            Err(e) => Err(CaError::Verification(format!(
                "{}: unreadable public key: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Verify `cert_path` against the trust anchor at `root_path`.
pub fn verify_certificate(
    cert_path: impl AsRef<Path>,
    root_path: impl AsRef<Path>,
) -> Result<VerifiedCertificate> {
    let cert = CertificateFile::read(cert_path)?;
    let root = CertificateFile::read(root_path)?;
    cert.verify_signed_by(&root)
}

/// Reject a certificate whose CN is not the basename of `cert_path`.
pub fn check_identity_binding(verified: &VerifiedCertificate, cert_path: &Path) -> Result<()> {
    let expected = common_name_for(cert_path)?;
    if verified.common_name == expected {
        Ok(())
    } else {
        Err(CaError::Verification(format!(
            "certificate {} carries CN {:?}",
            cert_path.display(),
            verified.common_name
        )))
    }
}

/// Full completeness check of one key pair in `dir`.
///
/// Both files must exist, the certificate must verify against the
/// directory's root and be bound to its file name, and the private key
/// must be the one the certificate certifies.
pub fn check_pair(dir: &KeyDirectory, names: &KeyPairNames) -> Result<VerifiedCertificate> {
    let public = dir.resolve(&names.public);
    let private = dir.resolve(&names.private);

    for path in [&public, &private] {
        if !path.is_file() {
            return Err(CaError::Verification(format!(
                "incomplete key pair: {} is missing",
                path.display()
            )));
        }
    }

    let cert = CertificateFile::read(&public)?;
    let root = CertificateFile::read(dir.root_cert())?;
    let verified = cert.verify_signed_by(&root)?;
    check_identity_binding(&verified, &public)?;

    let key = RsaKey::from_pem(&directory::read_text(&private)?)?;
    if key.modulus() != cert.rsa_modulus()? {
        return Err(CaError::Verification(format!(
            "{} does not belong to {}",
            private.display(),
            public.display()
        )));
    }

    Ok(verified)
}

fn first_value<'a, 'b>(mut attrs: impl Iterator<Item = &'b AttributeTypeAndValue<'a>>) -> String
where
    'a: 'b,
{
    attrs
        .next()
        .and_then(|attr| attr.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn serial_hex(raw: &[u8]) -> String {
    let trimmed = trim_leading_zeros(raw);
    if trimmed.is_empty() {
        return "00".to_string();
    }
    hex::encode(trimmed)
}

/// Convert an ASN.1 time to `DateTime<Utc>`.
fn asn1_to_utc(t: x509_parser::time::ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or_default()
}
