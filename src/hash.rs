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

//! Hash algorithm registry and document hashes.
//!
//! The algorithm identifiers are stable on the wire: they appear as the
//! first byte of every data imprint and inside hash chain steps, so their
//! numeric values must never change.

use std::fmt;

use der::oid::ObjectIdentifier;
use digest::{Digest, DynDigest};

use crate::errors::{Result, TimeSignatureError};

pub const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const OID_RIPEMD160: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.36.3.2.1");
pub const OID_SHA224: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.4");
pub const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// The hash algorithms accepted inside timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Ripemd160,
    Sha224,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Resolves a wire identifier byte.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Sha1),
            1 => Some(Self::Sha256),
            2 => Some(Self::Ripemd160),
            3 => Some(Self::Sha224),
            4 => Some(Self::Sha384),
            5 => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The wire identifier byte.
    pub fn id(self) -> u8 {
        match self {
            Self::Sha1 => 0,
            Self::Sha256 => 1,
            Self::Ripemd160 => 2,
            Self::Sha224 => 3,
            Self::Sha384 => 4,
            Self::Sha512 => 5,
        }
    }

    /// Output size of the algorithm in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Ripemd160 => 20,
            Self::Sha224 => 28,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            Self::Sha1 => OID_SHA1,
            Self::Sha256 => OID_SHA256,
            Self::Ripemd160 => OID_RIPEMD160,
            Self::Sha224 => OID_SHA224,
            Self::Sha384 => OID_SHA384,
            Self::Sha512 => OID_SHA512,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            OID_SHA1 => Some(Self::Sha1),
            OID_SHA256 => Some(Self::Sha256),
            OID_RIPEMD160 => Some(Self::Ripemd160),
            OID_SHA224 => Some(Self::Sha224),
            OID_SHA384 => Some(Self::Sha384),
            OID_SHA512 => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Ripemd160 => "RIPEMD160",
            Self::Sha224 => "SHA224",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Hashes `data` in one shot.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Ripemd160 => ripemd::Ripemd160::digest(data).to_vec(),
            Self::Sha224 => sha2::Sha224::digest(data).to_vec(),
            Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
            Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finished hash of a document.
///
/// Only closed hashes exist at this level: [`DataHasher`] holds the
/// running computation, and a `DataHash` can be created solely from a
/// finished one (or from digest bytes of the right length).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHash {
    pub algorithm: HashAlgorithm,
    pub digest: Vec<u8>,
}

impl DataHash {
    /// Hashes `data` with `algorithm` in one shot.
    pub fn calculate(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest(data),
        }
    }

    /// Wraps an externally computed digest, checking its length.
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Result<Self> {
        if digest.len() != algorithm.digest_len() {
            return Err(TimeSignatureError::InvalidArgument(
                "digest length does not match the hash algorithm",
            ));
        }
        Ok(Self { algorithm, digest })
    }
}

/// An incremental hash computation.
pub struct DataHasher {
    algorithm: HashAlgorithm,
    inner: Box<dyn DynDigest>,
}

impl DataHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner: Box<dyn DynDigest> = match algorithm {
            HashAlgorithm::Sha1 => Box::new(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Box::new(sha2::Sha256::new()),
            HashAlgorithm::Ripemd160 => Box::new(ripemd::Ripemd160::new()),
            HashAlgorithm::Sha224 => Box::new(sha2::Sha224::new()),
            HashAlgorithm::Sha384 => Box::new(sha2::Sha384::new()),
            HashAlgorithm::Sha512 => Box::new(sha2::Sha512::new()),
        };
        Self { algorithm, inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(self) -> DataHash {
        DataHash {
            algorithm: self.algorithm,
            digest: self.inner.finalize().to_vec(),
        }
    }
}

/// Computes a data imprint: the algorithm identifier byte followed by the
/// digest of `data` under that algorithm.
pub fn data_imprint(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut imprint = Vec::with_capacity(1 + algorithm.digest_len());
    imprint.push(algorithm.id());
    imprint.extend_from_slice(&algorithm.digest(data));
    imprint
}

/// Checks that `bytes` form a syntactically valid data imprint.
pub(crate) fn check_data_imprint(bytes: &[u8]) -> Result<()> {
    let Some(&id) = bytes.first() else {
        return Err(TimeSignatureError::InvalidFormat(
            "empty data imprint".into(),
        ));
    };
    let algorithm = HashAlgorithm::from_id(id)
        .ok_or_else(|| TimeSignatureError::UntrustedHashAlgorithm(format!("id {id}")))?;
    if bytes.len() != 1 + algorithm.digest_len() {
        return Err(TimeSignatureError::InvalidFormat(
            "data imprint length does not match its algorithm".into(),
        ));
    }
    Ok(())
}
