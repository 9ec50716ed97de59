//! Bundle and key fixtures.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use base64::Engine;
use rsa::RsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use std::io::{Cursor, Write};
use std::sync::OnceLock;
use uuid::Uuid;
use zip::write::SimpleFileOptions;

/// The `metadata.json` content of a fixture bundle. `salt` makes bundles
/// (and therefore update ids) distinct across tests.
#[allow(dead_code)]
pub fn bundle_metadata(salt: &str) -> String {
    format!(
        r#"{{"version":0,"bundler":"metro","fileMetadata":{{"ios":{{"bundle":"bundles/ios-{salt}.js","assets":[{{"path":"assets/icon-{salt}","ext":"png"}}]}},"android":{{"bundle":"bundles/android-{salt}.js","assets":[]}}}}}}"#
    )
}

/// The update id a bundle built from `salt` will produce.
#[allow(dead_code)]
pub fn expected_update_id(salt: &str) -> Uuid {
    updraft_core::update_id_from_metadata(bundle_metadata(salt).as_bytes())
}

/// Build a complete in-memory bundle archive for both platforms.
#[allow(dead_code)]
pub fn bundle_zip(salt: &str) -> Vec<u8> {
    let entries = [
        (
            "app.json".to_string(),
            br#"{"expo":{"name":"demo","slug":"demo"}}"#.to_vec(),
        ),
        (
            "package.json".to_string(),
            br#"{"dependencies":{"react":"18.2.0","react-native":"0.74.0"}}"#.to_vec(),
        ),
        ("metadata.json".to_string(), bundle_metadata(salt).into_bytes()),
        (
            format!("bundles/ios-{salt}.js"),
            format!("console.log('ios-{salt}')").into_bytes(),
        ),
        (
            format!("bundles/android-{salt}.js"),
            format!("console.log('android-{salt}')").into_bytes(),
        ),
        (
            format!("assets/icon-{salt}"),
            format!("\u{89}PNG-{salt}").into_bytes(),
        ),
    ];
    zip_from_entries(&entries)
}

/// Build a bundle whose metadata only describes iOS.
#[allow(dead_code)]
pub fn bundle_zip_ios_only(salt: &str) -> Vec<u8> {
    let metadata = format!(
        r#"{{"version":0,"fileMetadata":{{"ios":{{"bundle":"bundles/ios-{salt}.js","assets":[]}}}}}}"#
    );
    let entries = [
        (
            "app.json".to_string(),
            br#"{"expo":{"name":"demo","slug":"demo"}}"#.to_vec(),
        ),
        ("package.json".to_string(), br#"{"dependencies":{}}"#.to_vec()),
        ("metadata.json".to_string(), metadata.into_bytes()),
        (
            format!("bundles/ios-{salt}.js"),
            b"console.log('ios only')".to_vec(),
        ),
    ];
    zip_from_entries(&entries)
}

/// Build an archive missing the required `metadata.json` entry.
#[allow(dead_code)]
pub fn bundle_zip_without_metadata() -> Vec<u8> {
    let entries = [
        (
            "app.json".to_string(),
            br#"{"expo":{"name":"demo","slug":"demo"}}"#.to_vec(),
        ),
        ("package.json".to_string(), br#"{"dependencies":{}}"#.to_vec()),
    ];
    zip_from_entries(&entries)
}

fn zip_from_entries(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The RSA test key, generated once per test binary.
#[allow(dead_code)]
pub fn test_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand_core::OsRng;
        RsaPrivateKey::new(&mut rng, 2048).expect("keygen")
    })
}

/// The test key as a PKCS#8 PEM, the only form the signer accepts.
#[allow(dead_code)]
pub fn test_private_key_pem() -> String {
    test_rsa_key()
        .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
        .unwrap()
        .to_string()
}

/// A structurally valid certificate PEM. The PEM codec validates marker
/// structure and base64 only, which is all the registry requires.
#[allow(dead_code)]
pub fn test_certificate_pem() -> String {
    let body = base64::engine::general_purpose::STANDARD.encode(vec![0x30u8; 256]);
    format!("-----BEGIN CERTIFICATE-----\n{body}\n-----END CERTIFICATE-----\n")
}
