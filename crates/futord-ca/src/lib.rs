//! # futord-ca
//!
//! Delayed-disclosure key authority for futorcap.
//!
//! ## Architecture
//!
//! ```text
//! ROOT "Futord Root" (root.priv / root.pub, one per key directory)
//!        │
//!        ├── 2031-01-01_00-00-00_UTC.pub   (published now)
//!        ├── 2031-01-02_00-00-00_UTC.pub   (published now)
//!        └── ...
//! ```
//!
//! Every issued key pair is named after the moment its private key may be
//! released. Certificates go out immediately; `.priv` files are held back
//! by whoever distributes the directory. Nothing here enforces the wait.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futord_ca::{KeyDirectory, KeyPairIssuer, TimestampLabel};
//!
//! # fn main() -> futord_ca::Result<()> {
//! let issuer = KeyPairIssuer::new(KeyDirectory::new("keys"), 2048, "node1")?;
//!
//! // Once per directory, safe to repeat
//! issuer.root_manager().ensure_root()?;
//!
//! // Once per period
//! let pair = issuer.issue_label(&TimestampLabel::now())?;
//! println!("issued {}", pair.public_path.display());
//! # Ok(())
//! # }
//! ```

mod error;

pub mod backend;
pub mod config;
pub mod directory;
pub mod docs;
pub mod issuer;
pub mod keygen;
pub mod naming;
pub mod root;
pub mod serial;
pub mod subject;
pub mod verify;

pub use backend::{BackendKind, CaBackend, KeyBackend, PlainKeyBackend};
pub use config::FutordConfig;
pub use directory::KeyDirectory;
pub use docs::DocumentationPublisher;
pub use error::{CaError, Result, Step};
pub use issuer::{IssuedKeyPair, KeyPairIssuer};
pub use keygen::RsaKey;
pub use naming::{KeyPairNames, TimestampLabel};
pub use root::{RootAuthority, RootAuthorityManager};
pub use serial::SerialCounter;
pub use subject::{ConfiguredFields, SubjectName, SubjectTemplate};
pub use verify::{check_pair, verify_certificate, VerifiedCertificate};

/// Default lifetime of issued certificates, in days.
///
/// For timestamp-labelled pairs this is the margin kept after the release
/// instant, so a certificate is still valid when its private key goes out.
pub const DEFAULT_ISSUED_VALIDITY_DAYS: u32 = 10 * 365;

/// `99991231235959Z`: RFC 5280's "no well-defined expiration date".
pub const NO_EXPIRY: time::OffsetDateTime = time::macros::datetime!(9999-12-31 23:59:59 UTC);

/// Validity period presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityPeriod {
    /// Root authority: no well-defined expiry
    Root,
    /// Issued key pair: configurable days
    Issued(u32),
    /// Custom duration in days
    Custom(u32),
}

impl ValidityPeriod {
    /// Number of days, or `None` when the period never expires.
    pub const fn days(&self) -> Option<u32> {
        match self {
            Self::Root => None,
            Self::Issued(d) | Self::Custom(d) => Some(*d),
        }
    }

    /// `(not_before, not_after)` starting now.
    pub fn window(&self) -> (time::OffsetDateTime, time::OffsetDateTime) {
        let now = time::OffsetDateTime::now_utc();
        (now, self.end_after(now))
    }

    /// The instant this period ends if it starts at `start`.
    pub fn end_after(&self, start: time::OffsetDateTime) -> time::OffsetDateTime {
        self.days()
            .and_then(|d| start.checked_add(time::Duration::days(i64::from(d))))
            .map_or(NO_EXPIRY, |end| end.min(NO_EXPIRY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_periods() {
        assert_eq!(ValidityPeriod::Root.days(), None);
        assert_eq!(ValidityPeriod::Issued(3650).days(), Some(3650));
        assert_eq!(ValidityPeriod::Custom(1).days(), Some(1));
    }

    #[test]
    fn test_validity_window() {
        let (start, end) = ValidityPeriod::Issued(2).window();
        assert_eq!((end - start).whole_days(), 2);

        let (_, root_end) = ValidityPeriod::Root.window();
        assert_eq!(root_end, NO_EXPIRY);
    }

    #[test]
    fn test_end_after_clamps_to_no_expiry() {
        let late = time::macros::datetime!(9999-06-01 00:00:00 UTC);
        assert_eq!(ValidityPeriod::Issued(3650).end_after(late), NO_EXPIRY);
    }
}
