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

//! Fixture builder: synthetic but fully consistent timestamp tokens.
//!
//! The builder assembles everything a real gateway would emit: a
//! TSTInfo, the two signed attributes, a location chain that decodes to
//! a known issuer address, a history chain whose shape matches the
//! registration second, a publication imprint recomputed through both
//! chains, and an RSA PKI signature under a self-signed gateway
//! certificate.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use der::asn1::{Any, BitString, GeneralizedTime, Int, OctetString, SetOfVec};
use der::oid::ObjectIdentifier;
use der::{Decode, Encode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer};
use x509_cert::attr::Attribute;
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

use timesignature::asn1::{
    Accuracy, CertToken, CertTokenResponse, MessageImprint, PkiStatusInfo, PublishedData,
    SignatureInfo, TimeSignature, TstInfo, ID_CONTENT_TYPE, ID_CT_TST_INFO,
    ID_GT_TIME_SIGNATURE_ALG, ID_MESSAGE_DIGEST, ID_SIGNED_DATA,
};
use timesignature::chain::{fold, LevelBytes};
use timesignature::hash::{data_imprint, HashAlgorithm};
use timesignature::publications::{KeyHash, PublicationsOracle};
use timesignature::Timestamp;

pub const REGISTERED_TIME: u64 = 1_400_000_000;
pub const PUBLICATION_ID: u64 = 1_400_100_000;
pub const LATER_PUBLICATION_ID: u64 = 1_403_900_000;
pub const KEY_NOT_BEFORE: u64 = 1_390_000_000;

/// The issuer address the fixture location chain decodes to.
pub const LOCATION_ID: u64 = 1 << 48;

const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

pub struct Fixture {
    pub der: Vec<u8>,
    pub timestamp: Timestamp,
    pub document: Vec<u8>,
    pub registered_time: u64,
    pub publication_id: u64,
    pub published_data: PublishedData,
    /// The aggregation input: the client-algorithm imprint of the
    /// DER-encoded signed attributes.
    pub input_imprint: Vec<u8>,
    pub location_output: Vec<u8>,
}

pub fn int_from_u64(value: u64) -> Int {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    let mut out = Vec::new();
    if bytes[start] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[start..]);
    Int::new(&out).unwrap()
}

fn pseudo_digest(seed: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add((i as u64).wrapping_mul(1442695040888963407))
            >> 33) as u8;
    }
    out
}

/// Historical (direction-1) siblings shared by every history chain of
/// the same aggregation round.
fn shared_history_sibling(index: usize) -> [u8; 32] {
    pseudo_digest(0x5348_4152 + index as u64)
}

pub fn chain_step(direction: u8, sibling: &[u8], level: u8) -> Vec<u8> {
    let sibling_algorithm = match sibling.len() {
        20 => 0,
        32 => 1,
        28 => 3,
        len => panic!("no algorithm with digest length {len}"),
    };
    let mut out = vec![HashAlgorithm::Sha256.id(), direction, sibling_algorithm];
    out.extend_from_slice(sibling);
    out.push(level);
    out
}

/// A location chain decoding to `LOCATION_ID`: two client-level steps,
/// one step at each aggregation boundary, and an old-convention hasher
/// step.
pub fn location_chain() -> Vec<u8> {
    let mut chain = Vec::new();
    chain.extend(chain_step(0, &pseudo_digest(1), 1));
    chain.extend(chain_step(1, &pseudo_digest(2), 2));
    chain.extend(chain_step(0, &pseudo_digest(3), 23));
    chain.extend(chain_step(0, &pseudo_digest(4), 43));
    chain.extend(chain_step(0, &pseudo_digest(5), 65));
    chain.extend(chain_step(0, &pseudo_digest(6), 0xff));
    chain
}

/// A location chain whose level bytes decrease, but which still folds
/// and decodes.
pub fn unordered_location_chain() -> Vec<u8> {
    let mut chain = Vec::new();
    chain.extend(chain_step(0, &pseudo_digest(1), 2));
    chain.extend(chain_step(1, &pseudo_digest(2), 1));
    chain.extend(chain_step(0, &pseudo_digest(3), 23));
    chain.extend(chain_step(0, &pseudo_digest(4), 43));
    chain.extend(chain_step(0, &pseudo_digest(5), 65));
    chain.extend(chain_step(0, &pseudo_digest(6), 0xff));
    chain
}

/// Root-to-leaf turns through the calendar of `publication_id` down to
/// the leaf of `registered`, returned in chain (leaf-to-root) order.
fn history_directions(publication_id: u64, registered: u64) -> Vec<u8> {
    assert!(registered <= publication_id && publication_id > 0);
    let mut directions = Vec::new();
    let mut remaining = publication_id;
    let mut reached = 0u64;
    while remaining > 0 {
        let h = 1u64 << (63 - remaining.leading_zeros());
        if reached + h <= registered {
            directions.push(1);
            reached += h;
            remaining -= h;
        } else {
            directions.push(0);
            remaining = h - 1;
        }
    }
    assert_eq!(reached, registered);
    directions.reverse();
    directions
}

/// A history chain for the given round and publication. Direction-1
/// siblings are frozen past roots, shared across publications of the
/// same round; direction-0 siblings depend on the publication.
pub fn history_chain(publication_id: u64, registered: u64) -> Vec<u8> {
    let mut chain = Vec::new();
    let mut historical = 0usize;
    for (i, &direction) in history_directions(publication_id, registered).iter().enumerate() {
        let sibling = if direction == 1 {
            historical += 1;
            shared_history_sibling(historical - 1)
        } else {
            pseudo_digest(publication_id.wrapping_mul(1000).wrapping_add(i as u64))
        };
        chain.extend(chain_step(direction, &sibling, 0));
    }
    chain
}

fn sha256_with_rsa() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: SHA256_WITH_RSA,
        parameters: Some(Any::null()),
    }
}

fn digest_algorithm_identifier(algorithm: HashAlgorithm) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: algorithm.oid(),
        parameters: None,
    }
}

/// The self-signed gateway certificate and its key, generated once from
/// a fixed seed.
pub fn gateway_credentials() -> &'static (Certificate, RsaPrivateKey) {
    static CREDENTIALS: OnceLock<(Certificate, RsaPrivateKey)> = OnceLock::new();
    CREDENTIALS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x7469_6d65_7369_676e);
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
        let public_der = private_key
            .to_public_key()
            .to_public_key_der()
            .expect("encode public key");
        let spki = SubjectPublicKeyInfoOwned::from_der(public_der.as_bytes()).unwrap();
        let name = Name::from_str("CN=Testing Gateway,O=Example").unwrap();
        let validity = Validity {
            not_before: Time::GeneralTime(
                GeneralizedTime::from_unix_duration(Duration::from_secs(KEY_NOT_BEFORE)).unwrap(),
            ),
            not_after: Time::GeneralTime(
                GeneralizedTime::from_unix_duration(Duration::from_secs(
                    KEY_NOT_BEFORE + 10 * 365 * 86_400,
                ))
                .unwrap(),
            ),
        };
        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[0x2a]).unwrap(),
            signature: sha256_with_rsa(),
            issuer: name.clone(),
            validity,
            subject: name,
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        };
        let tbs_der = tbs.to_der().unwrap();
        let signer = SigningKey::<Sha256>::new(private_key.clone());
        let signature = signer.sign(&tbs_der);
        let certificate = Certificate {
            tbs_certificate: tbs,
            signature_algorithm: sha256_with_rsa(),
            signature: BitString::from_bytes(&signature.to_bytes()).unwrap(),
        };
        (certificate, private_key)
    })
}

/// DER of the gateway key's subject public key info, as hashed for key
/// fingerprints and the publications file.
pub fn gateway_key_der() -> Vec<u8> {
    gateway_credentials()
        .0
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .unwrap()
}

pub fn build_short_term(document: &[u8]) -> Fixture {
    build_token(
        document,
        REGISTERED_TIME,
        PUBLICATION_ID,
        location_chain(),
        HashAlgorithm::Sha256,
    )
}

pub fn build_short_term_at(document: &[u8], registered: u64) -> Fixture {
    build_token(
        document,
        registered,
        PUBLICATION_ID,
        location_chain(),
        HashAlgorithm::Sha256,
    )
}

pub fn build_short_term_with_location(document: &[u8], location: Vec<u8>) -> Fixture {
    build_token(
        document,
        REGISTERED_TIME,
        PUBLICATION_ID,
        location,
        HashAlgorithm::Sha256,
    )
}

/// A fixture whose signer-info digest algorithm differs from the
/// algorithm bytes encoded in the location chain steps (those stay
/// SHA-256), exercising the first-step fold rule.
pub fn build_short_term_with_client_algorithm(
    document: &[u8],
    client_algorithm: HashAlgorithm,
) -> Fixture {
    build_token(
        document,
        REGISTERED_TIME,
        PUBLICATION_ID,
        location_chain(),
        client_algorithm,
    )
}

fn build_token(
    document: &[u8],
    registered: u64,
    publication_id: u64,
    location: Vec<u8>,
    client_algorithm: HashAlgorithm,
) -> Fixture {
    let (certificate, private_key) = gateway_credentials();

    let tst_info = TstInfo {
        version: 1,
        policy: ObjectIdentifier::new_unwrap("1.3.6.1.4.1.27868.2.1"),
        message_imprint: MessageImprint {
            hash_algorithm: digest_algorithm_identifier(HashAlgorithm::Sha256),
            hashed_message: OctetString::new(HashAlgorithm::Sha256.digest(document)).unwrap(),
        },
        serial_number: Int::new(&[0x2a]).unwrap(),
        gen_time: GeneralizedTime::from_unix_duration(Duration::from_secs(registered)).unwrap(),
        accuracy: Some(Accuracy {
            seconds: Some(1),
            millis: Some(500),
            micros: None,
        }),
        ordering: false,
        nonce: None,
        tsa: None,
        extensions: None,
    };
    let tst_info_der = tst_info.to_der().unwrap();

    let content_type_attr = Attribute {
        oid: ID_CONTENT_TYPE,
        values: SetOfVec::try_from(vec![Any::encode_from(&ID_CT_TST_INFO).unwrap()]).unwrap(),
    };
    let message_digest_attr = Attribute {
        oid: ID_MESSAGE_DIGEST,
        values: SetOfVec::try_from(vec![Any::encode_from(
            &OctetString::new(client_algorithm.digest(&tst_info_der)).unwrap(),
        )
        .unwrap()])
        .unwrap(),
    };
    let signed_attrs: SignedAttributes =
        SetOfVec::try_from(vec![content_type_attr, message_digest_attr]).unwrap();

    let input = data_imprint(client_algorithm, &signed_attrs.to_der().unwrap());
    // The first location step folds under the client algorithm, not its
    // own encoded byte.
    let location_output =
        fold(&location, &input, LevelBytes::Hashed, Some(client_algorithm)).unwrap();
    let history = history_chain(publication_id, registered);
    let history_output = fold(&history, &location_output, LevelBytes::Omitted, None).unwrap();
    let published_data = PublishedData {
        publication_identifier: int_from_u64(publication_id),
        publication_imprint: OctetString::new(data_imprint(
            HashAlgorithm::Sha256,
            &history_output,
        ))
        .unwrap(),
    };

    let signer = SigningKey::<Sha256>::new(private_key.clone());
    let pk_signature = SignatureInfo {
        signature_algorithm: sha256_with_rsa(),
        signature_value: OctetString::new(
            signer.sign(&published_data.to_der().unwrap()).to_bytes(),
        )
        .unwrap(),
        key_commitment_ref: None,
    };

    let time_signature = TimeSignature {
        location: OctetString::new(location).unwrap(),
        history: OctetString::new(history).unwrap(),
        published_data: published_data.clone(),
        pk_signature: Some(pk_signature),
        pub_reference: None,
    };

    let signer_info = SignerInfo {
        version: CmsVersion::V1,
        sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: certificate.tbs_certificate.issuer.clone(),
            serial_number: certificate.tbs_certificate.serial_number.clone(),
        }),
        digest_alg: digest_algorithm_identifier(client_algorithm),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: ID_GT_TIME_SIGNATURE_ALG,
            parameters: Some(Any::null()),
        },
        signature: OctetString::new(time_signature.to_der().unwrap()).unwrap(),
        unsigned_attrs: None,
    };

    let signed_data = SignedData {
        version: CmsVersion::V3,
        digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier(
            client_algorithm,
        )])
        .unwrap(),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: ID_CT_TST_INFO,
            econtent: Some(Any::new(der::Tag::OctetString, tst_info_der).unwrap()),
        },
        certificates: Some(CertificateSet(
            SetOfVec::try_from(vec![CertificateChoices::Certificate(certificate.clone())])
                .unwrap(),
        )),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).unwrap()),
    };

    let content_info = ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::encode_from(&signed_data).unwrap(),
    };
    let der = content_info.to_der().unwrap();
    let timestamp = Timestamp::from_der(&der).unwrap();

    Fixture {
        der,
        timestamp,
        document: document.to_vec(),
        registered_time: registered,
        publication_id,
        published_data,
        input_imprint: input,
        location_output,
    }
}

pub fn granted_status() -> PkiStatusInfo {
    PkiStatusInfo {
        status: 0,
        status_string: None,
        fail_info: None,
    }
}

pub fn utf8_reference(text: &str) -> OctetString {
    let mut bytes = vec![0u8, 1];
    bytes.extend_from_slice(text.as_bytes());
    OctetString::new(bytes).unwrap()
}

/// Published data an extension to `publication_id` would carry for the
/// fixture's round.
pub fn extended_published_data(fixture: &Fixture, publication_id: u64) -> PublishedData {
    let history = history_chain(publication_id, fixture.registered_time);
    let history_output =
        fold(&history, &fixture.location_output, LevelBytes::Omitted, None).unwrap();
    PublishedData {
        publication_identifier: int_from_u64(publication_id),
        publication_imprint: OctetString::new(data_imprint(
            HashAlgorithm::Sha256,
            &history_output,
        ))
        .unwrap(),
    }
}

/// A granted extension response carrying the cert token for the
/// fixture's round at the given (later) publication.
pub fn build_extension_response(fixture: &Fixture, publication_id: u64) -> Vec<u8> {
    build_extension_response_for_round(fixture, publication_id, fixture.registered_time)
}

/// Same, but for an arbitrary round; used to provoke consistency
/// failures.
pub fn build_extension_response_for_round(
    fixture: &Fixture,
    publication_id: u64,
    registered: u64,
) -> Vec<u8> {
    let history = history_chain(publication_id, registered);
    let history_output =
        fold(&history, &fixture.location_output, LevelBytes::Omitted, None).unwrap();
    let cert_token = CertToken {
        version: 1,
        history: OctetString::new(history).unwrap(),
        published_data: PublishedData {
            publication_identifier: int_from_u64(publication_id),
            publication_imprint: OctetString::new(data_imprint(
                HashAlgorithm::Sha256,
                &history_output,
            ))
            .unwrap(),
        },
        pub_reference: SetOfVec::try_from(vec![utf8_reference(
            "https://example.org/publications",
        )])
        .unwrap(),
        extensions: None,
    };
    CertTokenResponse {
        status: granted_status(),
        cert_token: Some(cert_token),
    }
    .to_der()
    .unwrap()
}

/// In-memory publications oracle.
#[derive(Default)]
pub struct MemoryPublications {
    pub published: Vec<(u64, PublishedData)>,
    pub keys: Vec<KeyHash>,
}

impl PublicationsOracle for MemoryPublications {
    fn published_data(&self, publication_identifier: u64) -> Option<PublishedData> {
        self.published
            .iter()
            .find(|(id, _)| *id == publication_identifier)
            .map(|(_, data)| data.clone())
    }

    fn key_hashes(&self) -> Vec<KeyHash> {
        self.keys.clone()
    }
}

/// Locates `needle` inside `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
