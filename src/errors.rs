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

//! The errors that can be raised by timesignature

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimeSignatureError>;

#[derive(Error, Debug)]
pub enum TimeSignatureError {
    //
    // Syntax errors
    //
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("hash chain containing linking info is missing or invalid")]
    InvalidLinkingInfo,

    #[error("untrusted hash algorithm: {0}")]
    UntrustedHashAlgorithm(String),

    #[error("untrusted signature algorithm: {0}")]
    UntrustedSignatureAlgorithm(String),

    #[error("compared hashes are created using different hash algorithms")]
    DifferentHashAlgorithms,

    #[error("gateway reported an unrecognized or unsupported hash algorithm")]
    PkiBadAlg,

    #[error("gateway reported a bad request")]
    PkiBadRequest,

    #[error("gateway reported a bad data format")]
    PkiBadDataFormat,

    #[error("gateway reported an unsupported extension in the request")]
    ProtocolMismatch,

    #[error("gateway reported an unaccepted policy")]
    UnacceptedPolicy,

    #[error("gateway asked to retry the extension later")]
    NonstdExtendLater,

    #[error("gateway reported that the timestamp can no longer be extended")]
    NonstdExtensionOverdue,

    //
    // Semantic errors
    //
    #[error("the digest contained in the timestamp does not match the document")]
    WrongDocument,

    #[error("the number of history imprints was wrong")]
    WrongSizeOfHistory,

    #[error("the hash chains for request and time have different shapes")]
    RequestTimeMismatch,

    #[error("level bytes in the location hash chain are not properly ordered")]
    InvalidLengthBytes,

    #[error("hash chain aggregation does not produce the expected result")]
    InvalidAggregation,

    #[error("signature value in the timestamp is invalid")]
    InvalidSignature,

    #[error("the messageDigest attribute does not match the digest of TSTInfo")]
    WrongSignedData,

    #[error("no published data or trusted certificate found for the timestamp")]
    TrustPointNotFound,

    #[error("published data with the given identifier has different digests")]
    InvalidTrustPoint,

    #[error("extension response contains data that is not part of the timestamp")]
    CannotExtend,

    #[error("timestamp is already extended")]
    AlreadyExtended,

    #[error("the signing key is not found among the published ones")]
    KeyNotPublished,

    #[error("the signing key seems to have been used before it was published")]
    CertTicketTooOld,

    #[error("the signing key could not be traced to a trusted root")]
    CertNotTrusted,

    //
    // System errors
    //
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("a time value is outside the supported range")]
    TimeOverflow,

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(String),

    #[error("gateway reported an internal failure")]
    PkiSystemFailure,

    #[error("unexpected error condition")]
    Unknown,
}

/// Any ASN.1 decoding problem surfaces as a malformed-input error, the
/// same way every `d2i` failure did in the wire format's first client.
impl From<der::Error> for TimeSignatureError {
    fn from(err: der::Error) -> Self {
        TimeSignatureError::InvalidFormat(err.to_string())
    }
}
