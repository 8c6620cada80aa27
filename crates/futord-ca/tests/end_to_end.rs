//! Scheduler-level scenarios against a scratch key directory.

use std::fs;
use std::path::Path;

use futord_ca::verify::{check_identity_binding, CertificateFile};
use futord_ca::{
    check_pair, verify_certificate, CaBackend, CaError, ConfiguredFields, KeyBackend,
    KeyDirectory, KeyPairNames, RootAuthorityManager, RsaKey,
};
use tempfile::TempDir;

const LABEL: &str = "2099-01-01_00-00-00_UTC";

fn init_and_generate(dir: &Path) {
    let backend = CaBackend::default();
    let fields = ConfiguredFields::new();
    backend.init(dir, 2048, &fields).unwrap();
    backend
        .generate(
            Path::new(&format!("{LABEL}.pub")),
            Path::new(&format!("{LABEL}.priv")),
            dir,
            2048,
            &fields,
        )
        .unwrap();
}

#[test]
fn init_then_generate_from_empty_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("keys");

    let backend = CaBackend::default();
    backend.init(&dir, 2048, &ConfiguredFields::new()).unwrap();
    assert!(dir.join("root.priv").is_file());
    assert!(dir.join("root.pub").is_file());
    let readme = fs::read_to_string(dir.join("README.txt")).unwrap();
    assert!(readme.contains("Powered by futorcap.futord"));

    backend
        .generate(
            Path::new("2099-01-01_00-00-00_UTC.pub"),
            Path::new("2099-01-01_00-00-00_UTC.priv"),
            &dir,
            2048,
            &ConfiguredFields::new(),
        )
        .unwrap();

    let public = dir.join("2099-01-01_00-00-00_UTC.pub");
    assert!(public.is_file());
    assert!(dir.join("2099-01-01_00-00-00_UTC.priv").is_file());

    let verified = verify_certificate(&public, dir.join("root.pub")).unwrap();
    assert_eq!(verified.common_name, "2099-01-01_00-00-00_UTC.pub");
    assert_eq!(verified.organization, "Futorcap");
    check_identity_binding(&verified, &public).unwrap();
}

#[test]
fn issued_certificate_fails_against_unrelated_root() {
    let ours = TempDir::new().unwrap();
    let theirs = TempDir::new().unwrap();
    init_and_generate(ours.path());
    CaBackend::default()
        .init(theirs.path(), 2048, &ConfiguredFields::new())
        .unwrap();

    let public = ours.path().join(format!("{LABEL}.pub"));
    verify_certificate(&public, ours.path().join("root.pub")).unwrap();

    let err = verify_certificate(&public, theirs.path().join("root.pub")).unwrap_err();
    assert!(matches!(err, CaError::Verification(_)));
}

#[test]
fn generated_keys_are_valid_2048_bit_rsa() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());

    for name in ["root.priv", "2099-01-01_00-00-00_UTC.priv"] {
        let pem = fs::read_to_string(tmp.path().join(name)).unwrap();
        let key = RsaKey::from_pem(&pem).unwrap();
        key.validate().unwrap();
        assert_eq!(key.bits(), 2048, "{name}");
    }
}

#[test]
fn ensure_root_twice_leaves_root_untouched() {
    let tmp = TempDir::new().unwrap();
    let mgr = RootAuthorityManager::new(KeyDirectory::new(tmp.path()), 2048, "e2e").unwrap();

    mgr.ensure_root().unwrap();
    let key = fs::read(tmp.path().join("root.priv")).unwrap();
    let cert = fs::read(tmp.path().join("root.pub")).unwrap();

    mgr.ensure_root().unwrap();
    assert_eq!(fs::read(tmp.path().join("root.priv")).unwrap(), key);
    assert_eq!(fs::read(tmp.path().join("root.pub")).unwrap(), cert);
}

#[test]
fn lone_root_certificate_triggers_regeneration() {
    let tmp = TempDir::new().unwrap();
    let mgr = RootAuthorityManager::new(KeyDirectory::new(tmp.path()), 2048, "e2e").unwrap();
    mgr.ensure_root().unwrap();
    let old_key = fs::read(tmp.path().join("root.priv")).unwrap();
    let old_cert = fs::read(tmp.path().join("root.pub")).unwrap();

    fs::remove_file(tmp.path().join("root.priv")).unwrap();
    let root = mgr.ensure_root().unwrap();

    let new_key = fs::read(tmp.path().join("root.priv")).unwrap();
    let new_cert = fs::read(tmp.path().join("root.pub")).unwrap();
    assert_ne!(new_key, old_key);
    assert_ne!(new_cert, old_cert);
    assert_eq!(root.certificate_pem().as_bytes(), new_cert.as_slice());
}

#[test]
fn pairs_issued_before_root_rotation_no_longer_verify() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());
    let names = KeyPairNames::for_label(LABEL);
    let dir = KeyDirectory::new(tmp.path());
    check_pair(&dir, &names).unwrap();

    fs::remove_file(dir.root_cert()).unwrap();
    CaBackend::default()
        .init(tmp.path(), 2048, &ConfiguredFields::new())
        .unwrap();

    assert!(check_pair(&dir, &names).is_err());
}

#[test]
fn renamed_certificate_breaks_identity_binding() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());

    let forged = tmp.path().join("2000-01-01_00-00-00_UTC.pub");
    fs::copy(tmp.path().join(format!("{LABEL}.pub")), &forged).unwrap();

    let verified = verify_certificate(&forged, tmp.path().join("root.pub")).unwrap();
    assert!(check_identity_binding(&verified, &forged).is_err());
}

#[test]
fn half_issued_pair_is_reported_incomplete() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());
    fs::remove_file(tmp.path().join(format!("{LABEL}.pub"))).unwrap();

    let err = check_pair(&KeyDirectory::new(tmp.path()), &KeyPairNames::for_label(LABEL))
        .unwrap_err();
    assert!(err.to_string().contains("incomplete"));
}

#[test]
fn mismatched_private_key_is_detected() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());
    let other = RsaKey::generate(2048).unwrap();
    fs::write(tmp.path().join(format!("{LABEL}.priv")), other.private_key_pem()).unwrap();

    let err = check_pair(&KeyDirectory::new(tmp.path()), &KeyPairNames::for_label(LABEL))
        .unwrap_err();
    assert!(err.to_string().contains("does not belong"));
}

#[test]
fn root_certificate_describes_itself() {
    let tmp = TempDir::new().unwrap();
    let mgr = RootAuthorityManager::new(KeyDirectory::new(tmp.path()), 2048, "e2e").unwrap();
    mgr.ensure_root().unwrap();

    let root = CertificateFile::read(tmp.path().join("root.pub")).unwrap();
    let described = root.verify_signed_by(&root).unwrap();
    assert_eq!(described.common_name, "Futord Root");
    assert_eq!(described.organization, "futorcap.futord");
    assert_eq!(described.organizational_unit, "e2e");
    assert!(described.not_after > described.not_before);
}

#[test]
fn issued_certificate_outlives_its_release_time() {
    let tmp = TempDir::new().unwrap();
    init_and_generate(tmp.path());

    let release = futord_ca::TimestampLabel::parse(LABEL).unwrap().not_before();
    let cert = verify_certificate(tmp.path().join(format!("{LABEL}.pub")), tmp.path().join("root.pub"))
        .unwrap();
    let root = CertificateFile::read(tmp.path().join("root.pub"))
        .unwrap()
        .describe()
        .unwrap();

    assert!(cert.not_after >= release, "{} < {release}", cert.not_after);
    assert!(root.not_after >= cert.not_after);
}
