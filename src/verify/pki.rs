//
// Copyright 2024 The Timesignature Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Verifying the PKI signature of a short-term timestamp.
//!
//! The signature covers the DER-encoded published data and is made with
//! the gateway certificate carried in the token's certificate bag. This
//! check does not chain the certificate to a CA; binding the key to a
//! trust anchor happens against the publications file.

use cms::cert::CertificateChoices;
use cms::signed_data::{SignedData, SignerIdentifier};
use der::oid::ObjectIdentifier;
use der::Encode;
use rsa::pkcs8::DecodePublicKey;
use signature::hazmat::PrehashVerifier;
use signature::Verifier;
use x509_cert::Certificate;

use crate::asn1::{params_absent_or_null, PublishedData, SignatureInfo};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::HashAlgorithm;

const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP_256_R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP_384_R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

enum SignatureScheme {
    RsaPkcs1v15(HashAlgorithm),
    Ecdsa(HashAlgorithm),
}

impl SignatureScheme {
    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            SHA1_WITH_RSA => Some(Self::RsaPkcs1v15(HashAlgorithm::Sha1)),
            SHA256_WITH_RSA => Some(Self::RsaPkcs1v15(HashAlgorithm::Sha256)),
            SHA384_WITH_RSA => Some(Self::RsaPkcs1v15(HashAlgorithm::Sha384)),
            SHA512_WITH_RSA => Some(Self::RsaPkcs1v15(HashAlgorithm::Sha512)),
            ECDSA_WITH_SHA256 => Some(Self::Ecdsa(HashAlgorithm::Sha256)),
            ECDSA_WITH_SHA384 => Some(Self::Ecdsa(HashAlgorithm::Sha384)),
            _ => None,
        }
    }
}

/// Finds the certificate the single signer info points at, matching by
/// issuer and serial number.
pub(crate) fn find_signer_certificate(
    token: &SignedData,
    signer_id: &SignerIdentifier,
) -> Option<Certificate> {
    let SignerIdentifier::IssuerAndSerialNumber(issuer_serial) = signer_id else {
        return None;
    };
    let certificates = token.certificates.as_ref()?;
    certificates.0.iter().find_map(|choice| match choice {
        CertificateChoices::Certificate(cert)
            if cert.tbs_certificate.issuer == issuer_serial.issuer
                && cert.tbs_certificate.serial_number == issuer_serial.serial_number =>
        {
            Some(cert.clone())
        }
        _ => None,
    })
}

/// Verifies the PKI signature over the DER encoding of the published
/// data with the certificate's public key.
pub(crate) fn check_public_key_signature(
    published_data: &PublishedData,
    pk_signature: &SignatureInfo,
    certificate: &Certificate,
) -> Result<()> {
    let message = published_data
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;

    let algorithm = &pk_signature.signature_algorithm;
    if !params_absent_or_null(&algorithm.parameters) {
        return Err(TimeSignatureError::InvalidFormat(
            "unexpected signature algorithm parameters".into(),
        ));
    }
    let scheme = SignatureScheme::from_oid(&algorithm.oid).ok_or_else(|| {
        TimeSignatureError::UntrustedSignatureAlgorithm(algorithm.oid.to_string())
    })?;

    let signature = pk_signature.signature_value.as_bytes();
    match scheme {
        SignatureScheme::RsaPkcs1v15(digest) => {
            let spki_der = certificate
                .tbs_certificate
                .subject_public_key_info
                .to_der()
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
            let public_key = rsa::RsaPublicKey::from_public_key_der(&spki_der)
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
            match digest {
                HashAlgorithm::Sha1 => {
                    verify_rsa::<sha1::Sha1>(public_key, &message, signature)
                }
                HashAlgorithm::Sha256 => {
                    verify_rsa::<sha2::Sha256>(public_key, &message, signature)
                }
                HashAlgorithm::Sha384 => {
                    verify_rsa::<sha2::Sha384>(public_key, &message, signature)
                }
                HashAlgorithm::Sha512 => {
                    verify_rsa::<sha2::Sha512>(public_key, &message, signature)
                }
                other => Err(TimeSignatureError::UntrustedSignatureAlgorithm(
                    other.to_string(),
                )),
            }
        }
        SignatureScheme::Ecdsa(digest) => {
            verify_ecdsa(certificate, digest, &message, signature)
        }
    }
}

fn verify_rsa<D>(public_key: rsa::RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()>
where
    D: digest::Digest + der::oid::AssociatedOid,
{
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(public_key);
    let signature = rsa::pkcs1v15::Signature::try_from(signature)
        .map_err(|_| TimeSignatureError::InvalidSignature)?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| TimeSignatureError::InvalidSignature)
}

fn verify_ecdsa(
    certificate: &Certificate,
    digest: HashAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(TimeSignatureError::CryptoFailure(
            "certificate key is not an EC key".into(),
        ));
    }
    let curve: ObjectIdentifier = spki
        .algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| TimeSignatureError::CryptoFailure("missing EC curve parameters".into()))
        .and_then(|params| {
            params
                .decode_as()
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))
        })?;
    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| TimeSignatureError::CryptoFailure("invalid public key encoding".into()))?;
    let prehash = digest.digest(message);

    match curve {
        SECP_256_R1 => {
            let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| TimeSignatureError::InvalidSignature)?;
            verifying_key
                .verify_prehash(&prehash, &signature)
                .map_err(|_| TimeSignatureError::InvalidSignature)
        }
        SECP_384_R1 => {
            let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
            let signature = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| TimeSignatureError::InvalidSignature)?;
            verifying_key
                .verify_prehash(&prehash, &signature)
                .map_err(|_| TimeSignatureError::InvalidSignature)
        }
        other => Err(TimeSignatureError::UntrustedSignatureAlgorithm(
            other.to_string(),
        )),
    }
}
