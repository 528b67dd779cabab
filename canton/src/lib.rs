#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use spki::der::Decode as _;
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use thiserror::Error;

/// Hash purpose for topology transaction signing payloads.
pub const HASH_PURPOSE_TOPOLOGY_TRANSACTION: u32 = 11;
/// Hash purpose for public key fingerprints.
pub const HASH_PURPOSE_PUBLIC_KEY_FINGERPRINT: u32 = 12;

pub const KEY_FORMAT_DER_SPKI: &str = "CRYPTO_KEY_FORMAT_DER_X509_SUBJECT_PUBLIC_KEY_INFO";
pub const KEY_SPEC_EC_CURVE25519: &str = "SIGNING_KEY_SPEC_EC_CURVE25519";
pub const KEY_SPEC_EC_P256: &str = "SIGNING_KEY_SPEC_EC_P256";
pub const KEY_SPEC_EC_P384: &str = "SIGNING_KEY_SPEC_EC_P384";

pub const ALGORITHM_SPEC_ED25519: &str = "SIGNING_ALGORITHM_SPEC_ED25519";
pub const ALGORITHM_SPEC_EC_DSA_SHA_256: &str = "SIGNING_ALGORITHM_SPEC_EC_DSA_SHA_256";
pub const ALGORITHM_SPEC_EC_DSA_SHA_384: &str = "SIGNING_ALGORITHM_SPEC_EC_DSA_SHA_384";
pub const SIGNATURE_FORMAT_CONCAT: &str = "SIGNATURE_FORMAT_CONCAT";
pub const SIGNATURE_FORMAT_DER: &str = "SIGNATURE_FORMAT_DER";

const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_NIST_P256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_NIST_P384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to parse public key")]
    PublicKeyParse,
    #[error("failed to parse private key")]
    PrivateKeyParse,
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("unsupported elliptic curve: {0}")]
    UnsupportedCurve(String),
    #[error("unsupported key type")]
    UnsupportedKey,
    #[error("key type does not match algorithm spec")]
    KeyMismatch,
    #[error("signature is invalid")]
    SignatureInvalid,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Purpose-tagged multihash: `0x12 0x20 || SHA256(BE32(purpose) || data)`.
///
/// The two prefix bytes are the multihash header declaring a 32-byte
/// SHA-256 digest.
pub fn compute_hash(data: &[u8], purpose: u32) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(purpose.to_be_bytes());
    hasher.update(data);

    let mut out = vec![0x12, 0x20];
    out.extend_from_slice(&hasher.finalize());
    out
}

/// Key material description extracted from a DER SubjectPublicKeyInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    pub key_spec: &'static str,
    pub format: &'static str,
    pub public_key: Vec<u8>,
}

/// Parse a DER-encoded public key and classify its signing key spec.
pub fn inspect_public_key(data: &[u8]) -> Result<PublicKeyInfo, CryptoError> {
    let spki =
        SubjectPublicKeyInfoRef::from_der(data).map_err(|_| CryptoError::PublicKeyParse)?;

    let key_spec = if spki.algorithm.oid == OID_ED25519 {
        KEY_SPEC_EC_CURVE25519
    } else if spki.algorithm.oid == OID_EC_PUBLIC_KEY {
        let curve = spki
            .algorithm
            .parameters_oid()
            .map_err(|_| CryptoError::PublicKeyParse)?;
        if curve == OID_NIST_P256 {
            KEY_SPEC_EC_P256
        } else if curve == OID_NIST_P384 {
            KEY_SPEC_EC_P384
        } else {
            return Err(CryptoError::UnsupportedCurve(curve.to_string()));
        }
    } else {
        return Err(CryptoError::UnsupportedKey);
    };

    Ok(PublicKeyInfo {
        key_spec,
        format: KEY_FORMAT_DER_SPKI,
        public_key: data.to_vec(),
    })
}

/// Compute the Canton fingerprint of a public key.
///
/// Ed25519 keys contribute their raw 32 bytes; any other parseable key
/// contributes the full DER input; unparseable input is fingerprinted raw.
pub fn fingerprint(data: &[u8]) -> String {
    let key_data: &[u8] = match SubjectPublicKeyInfoRef::from_der(data) {
        Ok(spki) if spki.algorithm.oid == OID_ED25519 => spki.subject_public_key.raw_bytes(),
        Ok(_) => data,
        Err(_) => data,
    };
    hex::encode(compute_hash(key_data, HASH_PURPOSE_PUBLIC_KEY_FINGERPRINT))
}

/// Signature metadata derived from a human-readable algorithm name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMetadata {
    pub algorithm: &'static str,
    pub format: &'static str,
}

/// Map an algorithm name to the Canton protobuf enum strings. The set of
/// names is closed.
pub fn signature_metadata(algo: &str) -> Result<SignatureMetadata, CryptoError> {
    match algo {
        "ed25519" => Ok(SignatureMetadata {
            algorithm: ALGORITHM_SPEC_ED25519,
            format: SIGNATURE_FORMAT_CONCAT,
        }),
        "ecdsa256" => Ok(SignatureMetadata {
            algorithm: ALGORITHM_SPEC_EC_DSA_SHA_256,
            format: SIGNATURE_FORMAT_DER,
        }),
        "ecdsa384" => Ok(SignatureMetadata {
            algorithm: ALGORITHM_SPEC_EC_DSA_SHA_384,
            format: SIGNATURE_FORMAT_DER,
        }),
        other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Sign a message with a private key.
///
/// Ed25519 signs the message directly and accepts 32-byte seeds, 64-byte
/// keypairs or PKCS#8 DER. ECDSA hashes the message with SHA-256 (callers
/// pass a 34-byte Canton multihash) and emits an ASN.1 DER signature.
pub fn sign(message: &[u8], private_key: &[u8], algo: &str) -> Result<Vec<u8>, CryptoError> {
    match algo {
        "ed25519" => {
            use ed25519_dalek::pkcs8::DecodePrivateKey as _;
            use ed25519_dalek::{Signer as _, SigningKey};

            let key = if let Ok(seed) = <[u8; 32]>::try_from(private_key) {
                SigningKey::from_bytes(&seed)
            } else if let Ok(pair) = <[u8; 64]>::try_from(private_key) {
                SigningKey::from_keypair_bytes(&pair)
                    .map_err(|_| CryptoError::PrivateKeyParse)?
            } else {
                SigningKey::from_pkcs8_der(private_key)
                    .map_err(|_| CryptoError::PrivateKeyParse)?
            };
            Ok(key.sign(message).to_bytes().to_vec())
        }
        "ecdsa256" => {
            use p256::ecdsa::signature::hazmat::PrehashSigner as _;
            use p256::pkcs8::DecodePrivateKey as _;

            let key = match p256::ecdsa::SigningKey::from_pkcs8_der(private_key) {
                Ok(key) => key,
                Err(_) => p256::SecretKey::from_sec1_der(private_key)
                    .map(p256::ecdsa::SigningKey::from)
                    .map_err(|_| CryptoError::PrivateKeyParse)?,
            };
            let digest = Sha256::digest(message);
            let signature: p256::ecdsa::Signature = key
                .sign_prehash(digest.as_slice())
                .map_err(|e| CryptoError::Signing(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
        "ecdsa384" => {
            use p384::ecdsa::signature::hazmat::PrehashSigner as _;
            use p384::pkcs8::DecodePrivateKey as _;

            let key = match p384::ecdsa::SigningKey::from_pkcs8_der(private_key) {
                Ok(key) => key,
                Err(_) => p384::SecretKey::from_sec1_der(private_key)
                    .map(p384::ecdsa::SigningKey::from)
                    .map_err(|_| CryptoError::PrivateKeyParse)?,
            };
            let digest = Sha256::digest(message);
            let signature: p384::ecdsa::Signature = key
                .sign_prehash(digest.as_slice())
                .map_err(|e| CryptoError::Signing(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        }
        other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Verify a signature against a DER-encoded public key, dispatching on the
/// algorithm spec enum name.
///
/// A verification returning false is `SignatureInvalid`, distinct from key
/// parse or dispatch errors.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
    algo_spec: &str,
) -> Result<(), CryptoError> {
    match algo_spec {
        ALGORITHM_SPEC_ED25519 => {
            use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};

            let spki = SubjectPublicKeyInfoRef::from_der(public_key)
                .map_err(|_| CryptoError::PublicKeyParse)?;
            if spki.algorithm.oid != OID_ED25519 {
                return Err(CryptoError::KeyMismatch);
            }
            let raw: [u8; 32] = spki
                .subject_public_key
                .raw_bytes()
                .try_into()
                .map_err(|_| CryptoError::PublicKeyParse)?;
            let key = VerifyingKey::from_bytes(&raw).map_err(|_| CryptoError::PublicKeyParse)?;
            let signature =
                Signature::from_slice(signature).map_err(|_| CryptoError::SignatureInvalid)?;
            key.verify(message, &signature)
                .map_err(|_| CryptoError::SignatureInvalid)
        }
        ALGORITHM_SPEC_EC_DSA_SHA_256 => {
            use p256::ecdsa::signature::hazmat::PrehashVerifier as _;
            use p256::pkcs8::DecodePublicKey as _;

            let key = p256::ecdsa::VerifyingKey::from_public_key_der(public_key)
                .map_err(|_| CryptoError::KeyMismatch)?;
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| CryptoError::SignatureInvalid)?;
            key.verify_prehash(Sha256::digest(message).as_slice(), &signature)
                .map_err(|_| CryptoError::SignatureInvalid)
        }
        ALGORITHM_SPEC_EC_DSA_SHA_384 => {
            use p384::ecdsa::signature::hazmat::PrehashVerifier as _;
            use p384::pkcs8::DecodePublicKey as _;

            let key = p384::ecdsa::VerifyingKey::from_public_key_der(public_key)
                .map_err(|_| CryptoError::KeyMismatch)?;
            let signature = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| CryptoError::SignatureInvalid)?;
            key.verify_prehash(Sha256::digest(message).as_slice(), &signature)
                .map_err(|_| CryptoError::SignatureInvalid)
        }
        other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
    }
}
