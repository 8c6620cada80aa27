//! Root authority lifecycle.
//!
//! One self-signed root per key directory. Created on the first
//! [`RootAuthorityManager::ensure_root`] call and left alone after that,
//! as long as both `root.priv` and `root.pub` are present.

use rcgen::{BasicConstraints, Certificate, CertificateParams, IsCa, KeyPair, KeyUsagePurpose};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::directory::{self, KeyDirectory};
use crate::docs::DocumentationPublisher;
use crate::error::Step;
use crate::keygen::RsaKey;
use crate::serial::SerialCounter;
use crate::subject::{ConfiguredFields, SubjectName, SubjectTemplate};
use crate::verify::CertificateFile;
use crate::{CaError, Result, ValidityPeriod};

/// A loaded root authority: its key, its certificate, and its subject.
pub struct RootAuthority {
    key: RsaKey,
    signer: KeyPair,
    certificate: Certificate,
    certificate_pem: String,
    subject: SubjectName,
    not_after: OffsetDateTime,
}

impl std::fmt::Debug for RootAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootAuthority")
            .field("subject", &self.subject)
            .field("bits", &self.key.bits())
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

impl RootAuthority {
    /// Root private key.
    pub fn key(&self) -> &RsaKey {
        &self.key
    }

    /// Root key as a signer.
    pub fn signer(&self) -> &KeyPair {
        &self.signer
    }

    /// Issuer view of the root certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The root certificate exactly as distributed.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Subject of the root certificate.
    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    /// Last instant the root (and anything it signs) is valid.
    pub const fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }
}

/// Owns the root authority and CA serial counter of one key directory.
#[derive(Debug)]
pub struct RootAuthorityManager {
    dir: KeyDirectory,
    bits: usize,
    subject: SubjectName,
    validity: ValidityPeriod,
    serial: SerialCounter,
    docs: DocumentationPublisher,
}

impl RootAuthorityManager {
    /// Manager for `dir` whose root names `instance_name` as its OU.
    pub fn new(dir: KeyDirectory, bits: usize, instance_name: &str) -> Result<Self> {
        let fields = ConfiguredFields::new().with(crate::subject::INSTANCE_NAME_FIELD, instance_name);
        Self::from_fields(dir, bits, &SubjectTemplate::default(), &fields)
    }

    /// Manager whose root subject comes from a template and configured fields.
    pub fn from_fields(
        dir: KeyDirectory,
        bits: usize,
        template: &SubjectTemplate,
        fields: &ConfiguredFields,
    ) -> Result<Self> {
        let subject = template.root_subject(fields)?;
        let serial = SerialCounter::new(dir.serial_file());
        Ok(Self {
            dir,
            bits,
            subject,
            validity: ValidityPeriod::Root,
            serial,
            docs: DocumentationPublisher::new(),
        })
    }

    /// Override the root certificate lifetime.
    #[must_use]
    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = validity;
        self
    }

    /// Key directory this manager owns.
    pub fn directory(&self) -> &KeyDirectory {
        &self.dir
    }

    /// Subject a newly created root gets.
    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    /// The directory's CA serial counter.
    pub fn serial_counter(&self) -> &SerialCounter {
        &self.serial
    }

    /// Draw the next CA serial.
    pub fn next_serial(&self) -> Result<u64> {
        self.serial.next()
    }

    /// Make sure the directory has a root, then return it.
    ///
    /// The root is (re)generated unless both of its files exist. The
    /// README is rewritten on every call.
    pub fn ensure_root(&self) -> Result<RootAuthority> {
        self.dir.ensure_exists()?;

        let key_present = self.dir.root_key().is_file();
        let cert_present = self.dir.root_cert().is_file();
        if key_present && cert_present {
            debug!(dir = %self.dir.path().display(), "root authority already present");
        } else {
            if key_present || cert_present {
                warn!(
                    dir = %self.dir.path().display(),
                    key_present,
                    cert_present,
                    "incomplete root authority, regenerating both files"
                );
            }
            self.generate()?;
        }

        self.docs.publish(&self.dir)?;
        self.load()
    }

    /// Load the existing root without creating anything.
    pub fn load(&self) -> Result<RootAuthority> {
        let key = RsaKey::from_pem(&directory::read_text(&self.dir.root_key())?)?;
        let signer = key.signing_key()?;

        let cert_path = self.dir.root_cert();
        let certificate_pem = directory::read_text(&cert_path)?;
        let stored = CertificateFile::from_pem(&certificate_pem, &cert_path)?;
        let subject = stored.subject()?;
        let not_after = stored.not_after()?;

        // rcgen signs on behalf of a Certificate, so rebuild one from the
        // stored root's parameters; names and key identifiers come out the same.
        let params = CertificateParams::from_ca_cert_pem(&certificate_pem)
            .map_err(|e| CaError::key_gen(Step::LoadCertificate, e))?;
        let certificate = params
            .self_signed(&signer)
            .map_err(|e| CaError::key_gen(Step::LoadCertificate, e))?;

        Ok(RootAuthority {
            key,
            signer,
            certificate,
            certificate_pem,
            subject,
            not_after,
        })
    }

    fn generate(&self) -> Result<()> {
        let key = RsaKey::generate(self.bits)?;
        directory::write_private(&self.dir.root_key(), key.private_key_pem())?;

        let signer = key.signing_key()?;
        let mut params = CertificateParams::default();
        params.distinguished_name = self.subject.to_distinguished_name();
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let (not_before, not_after) = self.validity.window();
        params.not_before = not_before;
        params.not_after = not_after;

        let certificate = params
            .self_signed(&signer)
            .map_err(|e| CaError::key_gen(Step::SelfSign, e))?;
        directory::write_public(&self.dir.root_cert(), &certificate.pem())?;

        info!(
            dir = %self.dir.path().display(),
            bits = self.bits,
            subject = %self.subject,
            "created root authority"
        );
        Ok(())
    }
}
