//! Per-period key pair issuance.
//!
//! Issuance is four steps, each consuming the previous one's output:
//!
//! ```text
//! generate_private_key ──► build_signing_request ──► sign_request ──► emit_certificate
//!   (<label>.priv)            (PEM CSR)               (root key,        (<label>.pub)
//!                                                      next serial)
//! ```
//!
//! Nothing is rolled back on failure: a `.priv` without its `.pub` is what
//! an interrupted issuance leaves behind.

use std::path::{Path, PathBuf};

use rcgen::{
    Certificate, CertificateParams, CertificateSigningRequestParams, IsCa, KeyUsagePurpose,
    SerialNumber,
};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::directory::{self, KeyDirectory};
use crate::error::Step;
use crate::keygen::RsaKey;
use crate::naming::{common_name_for, TimestampLabel};
use crate::root::{RootAuthority, RootAuthorityManager};
use crate::subject::{ConfiguredFields, SubjectName, SubjectTemplate, INSTANCE_NAME_FIELD};
use crate::{CaError, Result, ValidityPeriod};

/// A key pair produced by [`KeyPairIssuer::issue`].
#[derive(Debug, Clone)]
pub struct IssuedKeyPair {
    /// Public file name without extension
    pub label: String,
    /// Where the certificate was written
    pub public_path: PathBuf,
    /// Where the private key was written
    pub private_path: PathBuf,
    /// Certificate subject
    pub subject: SubjectName,
    /// CA serial drawn for the certificate
    pub serial: u64,
    /// The certificate as written
    pub certificate_pem: String,
}

/// Issues root-signed key pairs into one key directory.
#[derive(Debug)]
pub struct KeyPairIssuer {
    root: RootAuthorityManager,
    bits: usize,
    template: SubjectTemplate,
    fields: ConfiguredFields,
    validity: ValidityPeriod,
}

impl KeyPairIssuer {
    /// Issuer for `dir` tagging certificates with `instance_name`.
    pub fn new(dir: KeyDirectory, bits: usize, instance_name: &str) -> Result<Self> {
        let fields = ConfiguredFields::new().with(INSTANCE_NAME_FIELD, instance_name);
        Self::from_fields(dir, bits, SubjectTemplate::default(), fields)
    }

    /// Issuer whose subjects come from a template and configured fields.
    pub fn from_fields(
        dir: KeyDirectory,
        bits: usize,
        template: SubjectTemplate,
        fields: ConfiguredFields,
    ) -> Result<Self> {
        let root = RootAuthorityManager::from_fields(dir, bits, &template, &fields)?;
        Ok(Self {
            root,
            bits,
            template,
            fields,
            validity: ValidityPeriod::Issued(crate::DEFAULT_ISSUED_VALIDITY_DAYS),
        })
    }

    /// Override the lifetime of issued certificates.
    #[must_use]
    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = validity;
        self
    }

    /// The root manager this issuer signs through.
    pub fn root_manager(&self) -> &RootAuthorityManager {
        &self.root
    }

    /// Issue the pair named by a timestamp label.
    pub fn issue_label(&self, label: &TimestampLabel) -> Result<IssuedKeyPair> {
        let names = label.names();
        self.issue(&names.public, &names.private)
    }

    /// Generate a key pair and a root-signed certificate for it.
    ///
    /// Relative names are placed in the key directory. The certificate's
    /// CN is the basename of `public_name`.
    pub fn issue(
        &self,
        public_name: impl AsRef<Path>,
        private_name: impl AsRef<Path>,
    ) -> Result<IssuedKeyPair> {
        let public_name = public_name.as_ref();
        let private_name = private_name.as_ref();
        if public_name.as_os_str().is_empty() {
            return Err(CaError::Argument("public name is required".into()));
        }
        if private_name.as_os_str().is_empty() {
            return Err(CaError::Argument("private name is required".into()));
        }

        let dir = self.root.directory();
        let public_path = dir.resolve(public_name);
        let private_path = dir.resolve(private_name);
        let common_name = common_name_for(public_name)?;
        let subject = self.template.issued_subject(&self.fields, &common_name)?;
        let root = self.root.load()?;
        let release = public_path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| TimestampLabel::parse(stem).ok());
        let window = validity_window(self.validity, release.as_ref(), &root)?;

        let key = generate_private_key(self.bits, &private_path)?;
        let request = build_signing_request(&key, &subject)?;
        let serial = self.root.next_serial()?;
        let certificate = sign_request(&request, &root, serial, window)?;
        let certificate_pem = emit_certificate(&certificate, &public_path)?;

        info!(
            public = %public_path.display(),
            serial,
            subject = %subject,
            "issued key pair"
        );

        let label = public_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&common_name)
            .to_string();

        Ok(IssuedKeyPair {
            label,
            public_path,
            private_path,
            subject,
            serial,
            certificate_pem,
        })
    }
}

/// Validity window for a certificate released at `release`.
///
/// The window starts now and ends `validity` after the later of now and
/// the release instant, so the certificate still verifies when its private
/// key is disclosed. A window the root does not cover is refused.
pub fn validity_window(
    validity: ValidityPeriod,
    release: Option<&TimestampLabel>,
    root: &RootAuthority,
) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let now = OffsetDateTime::now_utc();
    let start = match release {
        Some(label) => OffsetDateTime::from_unix_timestamp(label.not_before().timestamp())
            .map_err(|e| CaError::Argument(format!("label {label} is out of range: {e}")))?
            .max(now),
        None => now,
    };
    let not_after = validity.end_after(start);

    if not_after > root.not_after() {
        return Err(CaError::Argument(format!(
            "certificate would be valid until {not_after}, past the root's expiry {}; \
             issue an earlier label or raise root_validity_days",
            root.not_after()
        )));
    }
    Ok((now, not_after))
}

/// Step 1: generate an RSA key and persist it to `private_path`.
pub fn generate_private_key(bits: usize, private_path: &Path) -> Result<RsaKey> {
    let key = RsaKey::generate(bits)?;
    directory::write_private(private_path, key.private_key_pem())?;
    Ok(key)
}

/// Step 2: build a PEM signing request for `key` with `subject`.
pub fn build_signing_request(key: &RsaKey, subject: &SubjectName) -> Result<String> {
    let signer = key.signing_key()?;
    let mut params = CertificateParams::default();
    params.distinguished_name = subject.to_distinguished_name();

    let request = params
        .serialize_request(&signer)
        .map_err(|e| CaError::key_gen(Step::BuildRequest, e))?;
    let pem = request
        .pem()
        .map_err(|e| CaError::key_gen(Step::BuildRequest, e))?;
    debug!(subject = %subject, "built signing request");
    Ok(pem)
}

/// Step 3: sign a PEM request with the root, using `serial` and the
/// `(not_before, not_after)` window.
pub fn sign_request(
    request_pem: &str,
    root: &RootAuthority,
    serial: u64,
    (not_before, not_after): (OffsetDateTime, OffsetDateTime),
) -> Result<Certificate> {
    let mut request = CertificateSigningRequestParams::from_pem(request_pem)
        .map_err(|e| CaError::key_gen(Step::SignRequest, e))?;

    request.params.serial_number = Some(SerialNumber::from(serial));
    request.params.not_before = not_before;
    request.params.not_after = not_after;
    request.params.is_ca = IsCa::NoCa;
    request.params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    request.params.use_authority_key_identifier_extension = true;

    request
        .signed_by(root.certificate(), root.signer())
        .map_err(|e| CaError::key_gen(Step::SignRequest, e))
}

/// Step 4: write the certificate to `public_path`.
pub fn emit_certificate(certificate: &Certificate, public_path: &Path) -> Result<String> {
    let pem = certificate.pem();
    directory::write_public(public_path, &pem)?;
    Ok(pem)
}
