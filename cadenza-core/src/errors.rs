// Cadenza
// Copyright (c) 2024-2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error::Error as StdError;
use std::fmt;
use std::result;

/// `CadenzaError` provides an enumeration of all possible errors reported by Cadenza.
#[derive(Debug)]
pub enum CadenzaError {
    /// A model constraint was violated: capacity exceeded, identifier out of range, reference to a
    /// non-existent entity, duplicate where unique is required, or a value outside its legal range.
    Constraint(String),
    /// The input stream contained malformed data and could not be decoded. Covers wire-level
    /// problems: bad universal key, BER length overflow, truncated payload, CRC mismatch,
    /// malformed XML, illegal characters.
    Decode(&'static str),
    /// Like [`CadenzaError::Decode`], but with context computed at the failure site.
    Malformed(String),
    /// The declared profile and level cannot accommodate the model contents.
    Profile(String),
    /// The model uses a construct that cannot be represented in the translation target.
    Translation(String),
    /// A buffer supplied by the caller was too small for the operation.
    BufferTooSmall,
}

impl fmt::Display for CadenzaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CadenzaError::Constraint(ref msg) => {
                write!(f, "constraint violation: {}", msg)
            }
            CadenzaError::Decode(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            CadenzaError::Malformed(ref msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            CadenzaError::Profile(ref msg) => {
                write!(f, "profile violation: {}", msg)
            }
            CadenzaError::Translation(ref msg) => {
                write!(f, "translation restriction: {}", msg)
            }
            CadenzaError::BufferTooSmall => {
                write!(f, "supplied buffer is too small")
            }
        }
    }
}

impl StdError for CadenzaError {}

pub type Result<T> = result::Result<T, CadenzaError>;

/// Convenience function to create a constraint violation error.
pub fn constraint_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(CadenzaError::Constraint(msg.into()))
}

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(CadenzaError::Decode(desc))
}

/// Convenience function to create a decode error with computed context.
pub fn malformed_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(CadenzaError::Malformed(msg.into()))
}

/// Convenience function to create a profile violation error.
pub fn profile_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(CadenzaError::Profile(msg.into()))
}

/// Convenience function to create a translation restriction error.
pub fn translation_error<T>(msg: impl Into<String>) -> Result<T> {
    Err(CadenzaError::Translation(msg.into()))
}
