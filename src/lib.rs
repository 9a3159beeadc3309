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

//! Client-side library for Guardtime keyless timestamps.
//!
//! A keyless timestamp is a compact cryptographic proof binding a
//! document hash to a discrete moment in global time. This crate covers
//! the three client operations:
//!
//! - preparing a timestamping request over a document hash and decoding
//!   the gateway's response into a short-term, PKI-signed timestamp
//!   ([`timestamp::request`], [`timestamp::response`]);
//! - preparing an extension request for a short-term timestamp and
//!   folding the extender's response into a long-term, hash-linked one
//!   ([`timestamp::extend`]);
//! - verifying a timestamp syntactically, cryptographically and against
//!   an out-of-band publications file or document hash ([`verify`]).
//!
//! Network transport, storage and publications-file parsing are left to
//! the embedding application; verification consumes the publications
//! file through the [`publications::PublicationsOracle`] trait.
//!
//! All operations work on in-memory byte slices and are reentrant given
//! distinct inputs. Timestamps are immutable values: extension produces
//! a new [`Timestamp`] and never touches its input.

pub mod asn1;
pub mod chain;
pub mod encoding;
pub mod errors;
pub mod hash;
pub mod publications;
pub mod timestamp;
pub mod verify;

pub use crate::errors::{Result, TimeSignatureError};
pub use crate::hash::{DataHash, DataHasher, HashAlgorithm};
pub use crate::timestamp::extend::create_extended_timestamp;
pub use crate::timestamp::request::{prepare_extension_request, prepare_timestamp_request};
pub use crate::timestamp::response::create_timestamp;
pub use crate::timestamp::Timestamp;
pub use crate::verify::{
    check_document_hash, check_public_key, check_publication, verify, VerificationError,
    VerificationInfo, VerificationStatus,
};
