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

//! Timestamp verification.
//!
//! [`verify`] never short-circuits: every sub-check contributes a flag to
//! the error bitmap, so a caller always sees the full picture alongside
//! the implicit data recovered from the token. Only system-level
//! failures abort without producing a [`VerificationInfo`].

use std::fmt;

use bitflags::bitflags;
use der::asn1::OctetString;
use der::Encode;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::Certificate;

use crate::asn1::time::{format_unix, generalized_time_to_unix, x509_time_to_unix};
use crate::asn1::{int_to_u64, u64_to_int, Accuracy, PublishedData, ID_SIGNED_DATA};
use crate::chain;
use crate::encoding::{
    base32_encode, hex_colon, published_data_to_base32, CERTIFICATE_GROUP_LEN,
};
use crate::errors::{Result, TimeSignatureError};
use crate::hash::{data_imprint, DataHash, HashAlgorithm};
use crate::publications::PublicationsOracle;
use crate::timestamp::Timestamp;

mod hashchain;
mod location;
mod pki;
mod syntax;

bitflags! {
    /// Failures discovered during verification. The bit values are
    /// stable and shared with other implementations of the protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VerificationError: u32 {
        const SYNTACTIC_CHECK_FAILURE = 1;
        const HASHCHAIN_VERIFICATION_FAILURE = 2;
        const PUBLIC_KEY_SIGNATURE_FAILURE = 16;
        const NOT_VALID_PUBLIC_KEY_FAILURE = 64;
        const WRONG_DOCUMENT_FAILURE = 128;
        const NOT_VALID_PUBLICATION = 256;
    }
}

bitflags! {
    /// Conditions discovered during verification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VerificationStatus: u32 {
        const PUBLIC_KEY_SIGNATURE_PRESENT = 1;
        const PUBLICATION_REFERENCE_PRESENT = 2;
        const DOCUMENT_HASH_CHECKED = 16;
        const PUBLICATION_CHECKED = 32;
    }
}

/// The hash algorithm used for key fingerprints.
///
/// Fixed to SHA-256 regardless of what the publications file advertises;
/// changing it would break every previously distributed fingerprint.
pub const KEY_FINGERPRINT_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// The moment a gateway signing key is considered published.
///
/// Uses the certificate's `notBefore`. Whether validity start is really
/// the right publication moment is a protocol-level question; callers
/// with stricter requirements can apply their own policy on top.
pub fn key_publication_time(certificate: &Certificate) -> Result<i64> {
    x509_time_to_unix(&certificate.tbs_certificate.validity.not_before)
}

/// Implicit values computed from the shape of the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitInfo {
    /// Issuer address: four 16-bit fields packed
    /// `national | state | local | client`.
    pub location_id: u64,
    /// Issuer name assembled from aggregator name tags, if any.
    pub location_name: Option<String>,
    /// The second the aggregation round closed, recovered from the
    /// history chain shape.
    pub registered_time: i64,
    /// Base32 fingerprint of the gateway signing key; short-term
    /// timestamps only.
    pub public_key_fingerprint: Option<String>,
    /// Base32 publication string for hardcopy comparison; extended
    /// timestamps only.
    pub publication_string: Option<String>,
}

/// One hash chain step rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashStepInfo {
    pub hash_algorithm: u8,
    pub direction: u8,
    pub sibling_hash_algorithm: u8,
    pub sibling_hash_value: String,
    pub level: u8,
}

/// A signed attribute rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAttributeInfo {
    pub attr_type: String,
    /// DER encoding of the attribute value set, in hex.
    pub attr_value: String,
}

/// Every field decodable from the token, rendered for display. Produced
/// only when parsing is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitInfo {
    pub content_type: String,
    pub signed_data_version: i32,
    pub digest_algorithms: Vec<Option<HashAlgorithm>>,
    pub encap_content_type: String,
    pub tst_info_version: i32,
    pub policy: String,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub hash_value: String,
    pub serial_number: String,
    pub issuer_request_time: i64,
    /// Gateway clock precision in milliseconds, when stated.
    pub issuer_accuracy: Option<i64>,
    pub nonce: Option<String>,
    pub issuer_name: Option<String>,
    /// Gateway certificate in base32; short-term timestamps only.
    pub certificate: Option<String>,
    pub signer_info_version: i32,
    pub cert_issuer_name: String,
    pub cert_serial_number: String,
    pub digest_algorithm: Option<HashAlgorithm>,
    pub signed_attributes: Vec<SignedAttributeInfo>,
    pub signature_algorithm: String,
    pub location: Vec<HashStepInfo>,
    pub history: Vec<HashStepInfo>,
    pub publication_identifier: i64,
    pub publication_hash_algorithm: u8,
    pub publication_hash_value: String,
    pub pki_algorithm: Option<String>,
    pub pki_value: Option<String>,
    pub key_commitment_references: Vec<String>,
    pub publication_references: Vec<String>,
}

/// The outcome of verifying a timestamp.
#[derive(Debug, Clone)]
pub struct VerificationInfo {
    /// Failures found; empty means the timestamp verified.
    pub verification_errors: VerificationError,
    /// Which optional conditions were observed.
    pub verification_status: VerificationStatus,
    /// Always present.
    pub implicit: ImplicitInfo,
    /// Present when parsing was requested.
    pub explicit: Option<ExplicitInfo>,
}

/// Verifies a timestamp syntactically and cryptographically.
///
/// A populated [`VerificationInfo`] is returned even when checks fail;
/// inspect `verification_errors`. With `parse_explicit` set, every
/// decodable field of the token is included.
pub fn verify(timestamp: &Timestamp, parse_explicit: bool) -> Result<VerificationInfo> {
    let mut info = build_verification_info(timestamp, parse_explicit)?;

    if let Err(error) = syntax::check_timestamp_syntax(timestamp) {
        tracing::debug!(%error, "syntactic check failed");
        info.verification_errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
    }

    match hashchain::check_hash_chain_computation(timestamp) {
        Ok(()) => {}
        Err(
            error @ (TimeSignatureError::InvalidFormat(_)
            | TimeSignatureError::UntrustedHashAlgorithm(_)
            | TimeSignatureError::WrongSignedData
            | TimeSignatureError::InvalidAggregation),
        ) => {
            tracing::debug!(%error, "hash chain verification failed");
            info.verification_errors |= VerificationError::HASHCHAIN_VERIFICATION_FAILURE;
        }
        Err(error) => return Err(error),
    }

    if let Some(pk_signature) = &timestamp.time_signature().pk_signature {
        let outcome = match pki::find_signer_certificate(
            timestamp.token(),
            &timestamp.signer_info().sid,
        ) {
            Some(certificate) => pki::check_public_key_signature(
                &timestamp.time_signature().published_data,
                pk_signature,
                &certificate,
            ),
            None => Err(TimeSignatureError::InvalidFormat(
                "no certificate matches the signer info".into(),
            )),
        };
        match outcome {
            Ok(()) => {}
            Err(
                error @ (TimeSignatureError::InvalidFormat(_)
                | TimeSignatureError::UntrustedHashAlgorithm(_)
                | TimeSignatureError::UntrustedSignatureAlgorithm(_)
                | TimeSignatureError::WrongSignedData
                | TimeSignatureError::InvalidSignature),
            ) => {
                tracing::debug!(%error, "public key signature check failed");
                info.verification_errors |= VerificationError::PUBLIC_KEY_SIGNATURE_FAILURE;
            }
            Err(error) => return Err(error),
        }
    }

    Ok(info)
}

/// Compares the document hash embedded in the timestamp with a caller
/// supplied one.
pub fn check_document_hash(timestamp: &Timestamp, document_hash: &DataHash) -> Result<()> {
    let imprint = &timestamp.tst_info().message_imprint;
    let algorithm = timestamp.hash_algorithm()?;
    if algorithm != document_hash.algorithm {
        return Err(TimeSignatureError::DifferentHashAlgorithms);
    }
    if imprint.hashed_message.as_bytes() != document_hash.digest.as_slice() {
        return Err(TimeSignatureError::WrongDocument);
    }
    Ok(())
}

/// Checks that the publication embedded in an extended timestamp is
/// recorded, unchanged, in the publications file.
pub fn check_publication(
    timestamp: &Timestamp,
    publications: &dyn PublicationsOracle,
) -> Result<()> {
    let published_data = &timestamp.time_signature().published_data;
    let identifier = int_to_u64(&published_data.publication_identifier)?;
    let recorded = publications
        .published_data(identifier)
        .ok_or(TimeSignatureError::TrustPointNotFound)?;
    if &recorded != published_data {
        return Err(TimeSignatureError::InvalidTrustPoint);
    }
    Ok(())
}

/// Checks that the key which signed a short-term timestamp is published
/// and was published no later than the timestamp's registration.
pub fn check_public_key(
    timestamp: &Timestamp,
    registered_time: i64,
    publications: &dyn PublicationsOracle,
) -> Result<()> {
    if timestamp.is_extended() {
        return Err(TimeSignatureError::InvalidArgument(
            "extended timestamps carry no signing key",
        ));
    }
    let certificate =
        pki::find_signer_certificate(timestamp.token(), &timestamp.signer_info().sid)
            .ok_or_else(|| {
                TimeSignatureError::InvalidFormat("no certificate matches the signer info".into())
            })?;
    let key_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;

    let mut cached: Option<(u8, Vec<u8>)> = None;
    for key_hash in publications.key_hashes() {
        let Some(&algorithm_id) = key_hash.imprint.first() else {
            continue;
        };
        if cached.as_ref().map(|(id, _)| *id) != Some(algorithm_id) {
            cached = None;
            let Some(algorithm) = HashAlgorithm::from_id(algorithm_id) else {
                continue;
            };
            cached = Some((algorithm_id, data_imprint(algorithm, &key_der)));
        }
        if let Some((_, imprint)) = &cached {
            if *imprint == key_hash.imprint {
                if key_hash.publication_time > registered_time {
                    return Err(TimeSignatureError::CertTicketTooOld);
                }
                return Ok(());
            }
        }
    }
    Err(TimeSignatureError::KeyNotPublished)
}

/// Registered times above `i32::MAX` cannot be represented where the
/// platform's `time_t` is 32 bits wide.
fn registered_time_fits(seconds: u64) -> bool {
    if cfg!(target_pointer_width = "32") {
        seconds <= i32::MAX as u64
    } else {
        seconds <= i64::MAX as u64
    }
}

fn build_verification_info(
    timestamp: &Timestamp,
    parse_explicit: bool,
) -> Result<VerificationInfo> {
    let time_signature = timestamp.time_signature();
    let mut errors = VerificationError::empty();
    let mut status = VerificationStatus::empty();

    let explicit = if parse_explicit {
        Some(build_explicit_info(timestamp, &mut errors)?)
    } else {
        None
    };

    if time_signature.pk_signature.is_some() {
        status |= VerificationStatus::PUBLIC_KEY_SIGNATURE_PRESENT;
    }
    if time_signature
        .pub_reference
        .as_ref()
        .is_some_and(|refs| !refs.is_empty())
    {
        status |= VerificationStatus::PUBLICATION_REFERENCE_PRESENT;
    }

    let registered_time = match chain::registered_time(time_signature) {
        Ok(seconds) if registered_time_fits(seconds) => seconds as i64,
        Ok(_) => {
            errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
            0
        }
        Err(
            TimeSignatureError::InvalidFormat(_)
            | TimeSignatureError::InvalidLinkingInfo
            | TimeSignatureError::UnsupportedFormat(_),
        ) => {
            errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
            0
        }
        Err(error) => return Err(error),
    };

    let location = match location::extract_location(time_signature.location.as_bytes()) {
        Ok(location) => location,
        Err(TimeSignatureError::InvalidLinkingInfo) => {
            errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
            location::Location::default()
        }
        Err(error) => return Err(error),
    };

    let (public_key_fingerprint, publication_string) = if time_signature.pk_signature.is_some() {
        (Some(key_fingerprint(timestamp)?), None)
    } else {
        (
            None,
            Some(published_data_to_base32(&time_signature.published_data)?),
        )
    };

    Ok(VerificationInfo {
        verification_errors: errors,
        verification_status: status,
        implicit: ImplicitInfo {
            location_id: location.id,
            location_name: location.name,
            registered_time,
            public_key_fingerprint,
            publication_string,
        },
        explicit,
    })
}

/// Base32 fingerprint of the gateway signing key: the key's publication
/// moment paired with a SHA-256 imprint of its DER-encoded public key.
fn key_fingerprint(timestamp: &Timestamp) -> Result<String> {
    let certificate =
        pki::find_signer_certificate(timestamp.token(), &timestamp.signer_info().sid)
            .ok_or_else(|| {
                TimeSignatureError::InvalidFormat("no certificate matches the signer info".into())
            })?;
    let key_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
    let publication_time = key_publication_time(&certificate)?;
    if publication_time < 0 {
        return Err(TimeSignatureError::TimeOverflow);
    }
    let published_data = PublishedData {
        publication_identifier: u64_to_int(publication_time as u64)?,
        publication_imprint: OctetString::new(data_imprint(
            KEY_FINGERPRINT_ALGORITHM,
            &key_der,
        ))?,
    };
    published_data_to_base32(&published_data)
}

fn general_name_string(name: &GeneralName) -> String {
    match name {
        GeneralName::Rfc822Name(value) => format!("email:{}", value.as_str()),
        GeneralName::DnsName(value) => format!("DNS:{}", value.as_str()),
        GeneralName::UniformResourceIdentifier(value) => format!("URI:{}", value.as_str()),
        GeneralName::DirectoryName(value) => format!("DirName:{value}"),
        GeneralName::IpAddress(value) => format!("IP:{}", hex_colon(value.as_bytes())),
        GeneralName::RegisteredId(value) => format!("RID:{value}"),
        other => format!("{other:?}"),
    }
}

/// Seconds, millis and micros of the accuracy field, validated the way
/// the wire format demands: seconds unbounded, the subsecond components
/// in 1..=999 when present.
fn accuracy_components(accuracy: Option<&Accuracy>) -> Result<Option<(u32, u16, u16)>> {
    let Some(accuracy) = accuracy else {
        return Ok(None);
    };
    if accuracy.seconds.is_none() && accuracy.millis.is_none() && accuracy.micros.is_none() {
        return Ok(None);
    }
    for component in [accuracy.millis, accuracy.micros] {
        if component.is_some_and(|value| !(1..=999).contains(&value)) {
            return Err(TimeSignatureError::InvalidFormat(
                "accuracy component out of range".into(),
            ));
        }
    }
    Ok(Some((
        accuracy.seconds.unwrap_or(0),
        accuracy.millis.unwrap_or(0),
        accuracy.micros.unwrap_or(0),
    )))
}

fn step_infos(chain: &[u8]) -> Vec<HashStepInfo> {
    chain::parse_steps(chain)
        .map(|steps| {
            steps
                .iter()
                .map(|step| HashStepInfo {
                    hash_algorithm: step.algorithm,
                    direction: step.direction,
                    sibling_hash_algorithm: step.sibling_algorithm,
                    sibling_hash_value: hex_colon(step.sibling_digest),
                    level: step.level,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// References are UTF-8 when tagged `00 01`, otherwise shown as hex.
fn reference_strings<'a>(references: impl Iterator<Item = &'a OctetString>) -> Vec<String> {
    references
        .map(|reference| {
            let bytes = reference.as_bytes();
            if bytes.len() >= 2 && bytes[0] == 0 && bytes[1] == 1 {
                String::from_utf8_lossy(&bytes[2..]).into_owned()
            } else {
                hex_colon(bytes)
            }
        })
        .collect()
}

fn build_explicit_info(
    timestamp: &Timestamp,
    errors: &mut VerificationError,
) -> Result<ExplicitInfo> {
    let token = timestamp.token();
    let tst_info = timestamp.tst_info();
    let signer_info = timestamp.signer_info();
    let time_signature = timestamp.time_signature();

    let hash_algorithm =
        HashAlgorithm::from_oid(&tst_info.message_imprint.hash_algorithm.oid);
    if hash_algorithm.is_none() {
        *errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
    }

    let serial_bytes = tst_info.serial_number.as_bytes();
    if serial_bytes.first().is_some_and(|b| b & 0x80 != 0) {
        // Negative serial numbers are invalid.
        *errors |= VerificationError::SYNTACTIC_CHECK_FAILURE;
    }

    let issuer_accuracy = accuracy_components(tst_info.accuracy.as_ref())?
        .map(|(seconds, millis, _micros)| i64::from(seconds) * 1000 + i64::from(millis));

    let (cert_issuer_name, cert_serial_number) = match &signer_info.sid {
        cms::signed_data::SignerIdentifier::IssuerAndSerialNumber(issuer_serial) => (
            issuer_serial.issuer.to_string(),
            hex_colon(issuer_serial.serial_number.as_bytes()),
        ),
        cms::signed_data::SignerIdentifier::SubjectKeyIdentifier(_) => {
            (String::new(), String::new())
        }
    };

    let signed_attributes = signer_info
        .signed_attrs
        .as_ref()
        .map(|attributes| {
            attributes
                .iter()
                .map(|attribute| {
                    let value_der = attribute
                        .values
                        .to_der()
                        .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
                    Ok(SignedAttributeInfo {
                        attr_type: attribute.oid.to_string(),
                        attr_value: hex_colon(&value_der),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    let publication_identifier =
        int_to_u64(&time_signature.published_data.publication_identifier)?;
    if !registered_time_fits(publication_identifier) {
        return Err(TimeSignatureError::InvalidFormat(
            "publication identifier does not fit the platform time type".into(),
        ));
    }

    let publication_imprint = time_signature.published_data.publication_imprint.as_bytes();
    let Some(&publication_hash_algorithm) = publication_imprint.first() else {
        return Err(TimeSignatureError::InvalidFormat(
            "empty publication imprint".into(),
        ));
    };

    let (certificate, pki_algorithm, pki_value) = match &time_signature.pk_signature {
        Some(pk_signature) => {
            let certificate =
                pki::find_signer_certificate(token, &signer_info.sid).ok_or_else(|| {
                    TimeSignatureError::InvalidFormat(
                        "no certificate matches the signer info".into(),
                    )
                })?;
            let cert_der = certificate
                .to_der()
                .map_err(|e| TimeSignatureError::CryptoFailure(e.to_string()))?;
            (
                Some(base32_encode(&cert_der, CERTIFICATE_GROUP_LEN)),
                Some(pk_signature.signature_algorithm.oid.to_string()),
                Some(hex_colon(pk_signature.signature_value.as_bytes())),
            )
        }
        None => (None, None, None),
    };

    let key_commitment_references = time_signature
        .pk_signature
        .as_ref()
        .and_then(|pk| pk.key_commitment_ref.as_ref())
        .map(|refs| reference_strings(refs.iter()))
        .unwrap_or_default();
    let publication_references = time_signature
        .pub_reference
        .as_ref()
        .map(|refs| reference_strings(refs.iter()))
        .unwrap_or_default();

    Ok(ExplicitInfo {
        content_type: ID_SIGNED_DATA.to_string(),
        signed_data_version: token.version as i32,
        digest_algorithms: token
            .digest_algorithms
            .iter()
            .map(|alg| HashAlgorithm::from_oid(&alg.oid))
            .collect(),
        encap_content_type: token.encap_content_info.econtent_type.to_string(),
        tst_info_version: i32::from(tst_info.version),
        policy: tst_info.policy.to_string(),
        hash_algorithm,
        hash_value: hex_colon(tst_info.message_imprint.hashed_message.as_bytes()),
        serial_number: hex_colon(serial_bytes),
        issuer_request_time: generalized_time_to_unix(&tst_info.gen_time)?,
        issuer_accuracy,
        nonce: tst_info
            .nonce
            .as_ref()
            .map(|nonce| hex_colon(nonce.as_bytes())),
        issuer_name: tst_info.tsa.as_ref().map(general_name_string),
        certificate,
        signer_info_version: signer_info.version as i32,
        cert_issuer_name,
        cert_serial_number,
        digest_algorithm: HashAlgorithm::from_oid(&signer_info.digest_alg.oid),
        signed_attributes,
        signature_algorithm: signer_info.signature_algorithm.oid.to_string(),
        location: step_infos(time_signature.location.as_bytes()),
        history: step_infos(time_signature.history.as_bytes()),
        publication_identifier: publication_identifier as i64,
        publication_hash_algorithm,
        publication_hash_value: hex_colon(&publication_imprint[1..]),
        pki_algorithm,
        pki_value,
        key_commitment_references,
        publication_references,
    })
}

fn algorithm_name(algorithm: Option<HashAlgorithm>) -> &'static str {
    algorithm.map_or("(unknown)", HashAlgorithm::name)
}

fn flag_names<I>(names: I) -> String
where
    I: Iterator<Item = &'static str>,
{
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "NONE".to_string()
    } else {
        joined
    }
}

impl fmt::Display for VerificationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "verification_errors = {} ({})",
            self.verification_errors.bits(),
            flag_names(self.verification_errors.iter_names().map(|(name, _)| name))
        )?;
        writeln!(
            f,
            "verification_status = {} ({})",
            self.verification_status.bits(),
            flag_names(self.verification_status.iter_names().map(|(name, _)| name))
        )?;
        writeln!(f, "implicit_data:")?;
        let id = self.implicit.location_id;
        writeln!(
            f,
            "  location_id = {}.{}.{}.{}",
            id >> 48 & 0xffff,
            id >> 32 & 0xffff,
            id >> 16 & 0xffff,
            id & 0xffff
        )?;
        writeln!(
            f,
            "  location_name = {}",
            self.implicit.location_name.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  registered_time = {} ({})",
            self.implicit.registered_time,
            format_unix(self.implicit.registered_time)
        )?;
        writeln!(
            f,
            "  public_key_fingerprint = {}",
            self.implicit
                .public_key_fingerprint
                .as_deref()
                .unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  publication_string = {}",
            self.implicit.publication_string.as_deref().unwrap_or("N/A")
        )?;
        writeln!(f, "explicit_data:")?;
        let Some(explicit) = &self.explicit else {
            return writeln!(f, "  N/A");
        };
        writeln!(f, "  content_type = {}", explicit.content_type)?;
        writeln!(
            f,
            "  signed_data_version = {}",
            explicit.signed_data_version
        )?;
        writeln!(f, "  digest_algorithm_list:")?;
        for (index, algorithm) in explicit.digest_algorithms.iter().enumerate() {
            writeln!(
                f,
                "    digest algorithm {index}: {}",
                algorithm_name(*algorithm)
            )?;
        }
        writeln!(f, "  encap_content_type = {}", explicit.encap_content_type)?;
        writeln!(f, "  tst_info_version = {}", explicit.tst_info_version)?;
        writeln!(f, "  policy = {}", explicit.policy)?;
        writeln!(
            f,
            "  hash_algorithm = {}",
            algorithm_name(explicit.hash_algorithm)
        )?;
        writeln!(f, "  hash_value = {}", explicit.hash_value)?;
        writeln!(f, "  serial_number = {}", explicit.serial_number)?;
        writeln!(
            f,
            "  issuer_request_time = {} ({})",
            explicit.issuer_request_time,
            format_unix(explicit.issuer_request_time)
        )?;
        match explicit.issuer_accuracy {
            Some(accuracy) => writeln!(f, "  issuer_accuracy = {accuracy}")?,
            None => writeln!(f, "  issuer_accuracy = N/A")?,
        }
        writeln!(
            f,
            "  nonce = {}",
            explicit.nonce.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  issuer_name = {}",
            explicit.issuer_name.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  certificate = {}",
            explicit.certificate.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  signer_info_version = {}",
            explicit.signer_info_version
        )?;
        writeln!(f, "  cert_issuer_name = {}", explicit.cert_issuer_name)?;
        writeln!(f, "  cert_serial_number = {}", explicit.cert_serial_number)?;
        writeln!(
            f,
            "  digest_algorithm = {}",
            algorithm_name(explicit.digest_algorithm)
        )?;
        writeln!(f, "  signed_attr_list:")?;
        for attribute in &explicit.signed_attributes {
            writeln!(f, "    attr_type = {}", attribute.attr_type)?;
            writeln!(f, "    attr_value = {}", attribute.attr_value)?;
        }
        writeln!(
            f,
            "  signature_algorithm = {}",
            explicit.signature_algorithm
        )?;
        for (label, steps) in [("location", &explicit.location), ("history", &explicit.history)]
        {
            writeln!(f, "  {label}_list:")?;
            for (index, step) in steps.iter().enumerate() {
                writeln!(f, "    {label} hash chain entry {index}:")?;
                writeln!(f, "      hash_algorithm = {}", step.hash_algorithm)?;
                writeln!(f, "      direction = {}", step.direction)?;
                writeln!(
                    f,
                    "      sibling_hash_algorithm = {}",
                    step.sibling_hash_algorithm
                )?;
                writeln!(f, "      sibling_hash_value = {}", step.sibling_hash_value)?;
                writeln!(f, "      level = {}", step.level)?;
            }
        }
        writeln!(
            f,
            "  publication_identifier = {} ({})",
            explicit.publication_identifier,
            format_unix(explicit.publication_identifier)
        )?;
        writeln!(
            f,
            "  publication_hash_algorithm = {}",
            explicit.publication_hash_algorithm
        )?;
        writeln!(
            f,
            "  publication_hash_value = {}",
            explicit.publication_hash_value
        )?;
        writeln!(
            f,
            "  pki_algorithm = {}",
            explicit.pki_algorithm.as_deref().unwrap_or("N/A")
        )?;
        writeln!(
            f,
            "  pki_value = {}",
            explicit.pki_value.as_deref().unwrap_or("N/A")
        )?;
        writeln!(f, "  key_commitment_ref_list:")?;
        for reference in &explicit.key_commitment_references {
            writeln!(f, "    {reference}")?;
        }
        writeln!(f, "  pub_reference_list:")?;
        for reference in &explicit.publication_references {
            writeln!(f, "    {reference}")?;
        }
        Ok(())
    }
}
