//! Usage instructions published into every key directory.

use tracing::debug;

use crate::directory::{self, KeyDirectory};
use crate::Result;

/// Marker line every published README ends with.
pub const POWERED_BY: &str = "Powered by futorcap.futord";

const README: &str = "\
Delayed-disclosure keys
=======================

Every key pair in this directory is named after a UTC timestamp:

    YYYY-MM-DD_HH-MM-SS_UTC.pub    certificate, published immediately
    YYYY-MM-DD_HH-MM-SS_UTC.priv   private key, released once the timestamp has passed

File names sort in time order. Nothing in the files themselves stops a
private key from being released early; that is up to whoever publishes them.

Encrypting for the future
-------------------------

Pick the certificate for the moment the message may be read and encrypt
with it:

    openssl pkeyutl -encrypt -certin -inkey 2099-01-01_00-00-00_UTC.pub \\
        -in message.txt -out message.enc

RSA can only encrypt a short payload. For anything larger, encrypt a random
symmetric key this way and the payload with that key.

Decrypting
----------

Once the matching private key has been released:

    openssl pkeyutl -decrypt -inkey 2099-01-01_00-00-00_UTC.priv \\
        -in message.enc -out message.txt

Verifying certificates
----------------------

Every certificate is signed by root.pub, the root of this directory.
Certificates stay valid past their own release time, and root.pub
outlives every certificate it signs.
Before trusting a certificate, check the signature:

    openssl verify -CAfile root.pub 2099-01-01_00-00-00_UTC.pub

and check that its Common Name is exactly its own file name:

    openssl x509 -in 2099-01-01_00-00-00_UTC.pub -noout -subject

A certificate whose CN names a different file must be rejected, even if
the signature is good: it was issued for another moment.

A .priv file without its .pub (or the other way round) is the trace of an
interrupted issuance and should not be used.

";

/// Writes the static README describing how to use the key material.
#[derive(Debug, Clone, Default)]
pub struct DocumentationPublisher;

impl DocumentationPublisher {
    /// Create a publisher.
    pub const fn new() -> Self {
        Self
    }

    /// README contents.
    pub fn render(&self) -> String {
        format!("{README}{POWERED_BY}\n")
    }

    /// (Over)write `README.txt` in `dir`.
    pub fn publish(&self, dir: &KeyDirectory) -> Result<()> {
        let path = dir.readme();
        directory::write_public(&path, &self.render())?;
        debug!(path = %path.display(), "published README");
        Ok(())
    }
}
