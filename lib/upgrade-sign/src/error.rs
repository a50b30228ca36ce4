// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the multisignature protocol.

/// Coarse classification of an [`Error`].
///
/// Extends the container format's taxonomy with `Crypto`: key material and
/// signature failures are surfaced distinctly from format errors because
/// callers respond differently (re-prompt for a passphrase vs. abort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Range,
    Policy,
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A container format error bubbled up unchanged.
    Format(upgrade_format::Error),

    /// The signing message requires at least one payload section.
    NoPayloadSections,
    /// Only `boot` and `main` sections may be signed.
    UnsupportedSectionForSigning,
    /// Payload sections must precede the single trailing signature section.
    SectionOrdering,
    /// This key's fingerprint is already present in the signature section.
    AlreadySigned,

    /// The signing message could not be Bech32-encoded.
    MessageEncoding,
    /// Messages to sign or verify must not be empty.
    EmptyMessage,

    /// Private key is not a valid secp256k1 scalar.
    MalformedSecretKey,
    /// Public key is not a 65-byte uncompressed point.
    MalformedPublicKey,
    /// Recoverable signature is not valid Base64 of 65 bytes with a sane
    /// header byte.
    MalformedSignature,
    /// ECDSA signing failed.
    SigningFailed,
    /// Public key recovery from signature and message failed.
    RecoveryFailed,

    /// Wrong passphrase for an encrypted key container.
    InvalidPassphrase,
    /// Key container uses an encryption scheme this tool does not support.
    UnsupportedKeyEncryption,
    /// Key container is not a recognized PEM private key.
    MalformedKey,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(e) => match e.kind() {
                upgrade_format::ErrorKind::Format => ErrorKind::Format,
                upgrade_format::ErrorKind::Range => ErrorKind::Range,
                upgrade_format::ErrorKind::Policy => ErrorKind::Policy,
            },

            Error::NoPayloadSections
            | Error::UnsupportedSectionForSigning
            | Error::SectionOrdering
            | Error::AlreadySigned => ErrorKind::Policy,

            Error::MessageEncoding => ErrorKind::Format,
            Error::EmptyMessage => ErrorKind::Range,

            Error::MalformedSecretKey
            | Error::MalformedPublicKey
            | Error::MalformedSignature
            | Error::SigningFailed
            | Error::RecoveryFailed
            | Error::InvalidPassphrase
            | Error::UnsupportedKeyEncryption
            | Error::MalformedKey => ErrorKind::Crypto,
        }
    }
}

impl From<upgrade_format::Error> for Error {
    fn from(e: upgrade_format::Error) -> Self {
        Error::Format(e)
    }
}
