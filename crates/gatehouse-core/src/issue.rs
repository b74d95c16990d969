//! Typed validation issues.
//!
//! Validators persist issues as an integer code plus an opaque JSON payload.
//! [`ValidationIssue::from_parts`] turns that pair back into a typed value;
//! it never fails, so a record written by a newer validator (or a corrupt
//! one) still renders as [`ValidationIssue::Unknown`].

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

// ─── Codes ───────────────────────────────────────────────────────────────────

/// The integer code stored alongside each issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum IssueCode {
  Unknown = 0,
  PackageIsSigned = 1,
  ClientSigningVerificationFailure = 2,
  PackageIsZip64 = 3,
  OnlyAuthorSignaturesSupported = 4,
  AuthorAndRepositoryCounterSignaturesNotSupported = 5,
  OnlySignatureFormatVersion1Supported = 6,
  AuthorCounterSignaturesNotSupported = 7,
  PackageIsNotSigned = 8,
  PackageIsSignedWithUnauthorizedCertificate = 9,
  SymbolChecksumDoesNotMatch = 250,
  SymbolMatchingAssemblyNotFound = 251,
  SymbolPdbIsNotPortable = 252,
}

impl IssueCode {
  pub fn from_i32(code: i32) -> Option<Self> {
    Some(match code {
      0 => Self::Unknown,
      1 => Self::PackageIsSigned,
      2 => Self::ClientSigningVerificationFailure,
      3 => Self::PackageIsZip64,
      4 => Self::OnlyAuthorSignaturesSupported,
      5 => Self::AuthorAndRepositoryCounterSignaturesNotSupported,
      6 => Self::OnlySignatureFormatVersion1Supported,
      7 => Self::AuthorCounterSignaturesNotSupported,
      8 => Self::PackageIsNotSigned,
      9 => Self::PackageIsSignedWithUnauthorizedCertificate,
      250 => Self::SymbolChecksumDoesNotMatch,
      251 => Self::SymbolMatchingAssemblyNotFound,
      252 => Self::SymbolPdbIsNotPortable,
      _ => return None,
    })
  }

  pub fn as_i32(self) -> i32 { self as i32 }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// NuGet client verification failed; carries the client's own error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSigningFailure {
  #[serde(rename = "c")]
  pub client_code:    String,
  #[serde(rename = "m")]
  pub client_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnauthorizedCertificate {
  #[serde(rename = "t")]
  pub sha1_thumbprint: String,
}

/// Names the assembly a symbols check complained about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolAssembly {
  #[serde(rename = "f")]
  pub assembly_file_name: String,
}

/// The raw pair behind an issue that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedIssue {
  pub code: i32,
  pub data: Option<String>,
}

// ─── ValidationIssue ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
  /// Generic failure. Holds the original record when it came from an
  /// unrecognized or malformed issue; that record is informational only and
  /// does not take part in deduplication.
  Unknown(Option<UnrecognizedIssue>),
  PackageIsSigned,
  ClientSigningVerificationFailure(ClientSigningFailure),
  PackageIsZip64,
  OnlyAuthorSignaturesSupported,
  AuthorAndRepositoryCounterSignaturesNotSupported,
  OnlySignatureFormatVersion1Supported,
  AuthorCounterSignaturesNotSupported,
  PackageIsNotSigned,
  PackageIsSignedWithUnauthorizedCertificate(UnauthorizedCertificate),
  SymbolChecksumDoesNotMatch(SymbolAssembly),
  SymbolMatchingAssemblyNotFound,
  SymbolPdbIsNotPortable(SymbolAssembly),
}

impl ValidationIssue {
  /// The generic issue shown when nothing more specific is known.
  pub fn unknown() -> Self { Self::Unknown(None) }

  pub fn code(&self) -> IssueCode {
    match self {
      Self::Unknown(_) => IssueCode::Unknown,
      Self::PackageIsSigned => IssueCode::PackageIsSigned,
      Self::ClientSigningVerificationFailure(_) => {
        IssueCode::ClientSigningVerificationFailure
      }
      Self::PackageIsZip64 => IssueCode::PackageIsZip64,
      Self::OnlyAuthorSignaturesSupported => {
        IssueCode::OnlyAuthorSignaturesSupported
      }
      Self::AuthorAndRepositoryCounterSignaturesNotSupported => {
        IssueCode::AuthorAndRepositoryCounterSignaturesNotSupported
      }
      Self::OnlySignatureFormatVersion1Supported => {
        IssueCode::OnlySignatureFormatVersion1Supported
      }
      Self::AuthorCounterSignaturesNotSupported => {
        IssueCode::AuthorCounterSignaturesNotSupported
      }
      Self::PackageIsNotSigned => IssueCode::PackageIsNotSigned,
      Self::PackageIsSignedWithUnauthorizedCertificate(_) => {
        IssueCode::PackageIsSignedWithUnauthorizedCertificate
      }
      Self::SymbolChecksumDoesNotMatch(_) => IssueCode::SymbolChecksumDoesNotMatch,
      Self::SymbolMatchingAssemblyNotFound => {
        IssueCode::SymbolMatchingAssemblyNotFound
      }
      Self::SymbolPdbIsNotPortable(_) => IssueCode::SymbolPdbIsNotPortable,
    }
  }

  /// Decode a persisted `(code, data)` pair. Unrecognized codes, missing
  /// payloads and malformed JSON all decode to [`Self::Unknown`].
  pub fn from_parts(code: i32, data: Option<&str>) -> Self {
    let Some(kind) = IssueCode::from_i32(code) else {
      tracing::warn!(code, "unrecognized validation issue code");
      return Self::unrecognized(code, data);
    };

    match kind {
      IssueCode::Unknown => Self::unknown(),
      IssueCode::PackageIsSigned => Self::PackageIsSigned,
      IssueCode::ClientSigningVerificationFailure => {
        decode_payload(code, data, Self::ClientSigningVerificationFailure)
      }
      IssueCode::PackageIsZip64 => Self::PackageIsZip64,
      IssueCode::OnlyAuthorSignaturesSupported => {
        Self::OnlyAuthorSignaturesSupported
      }
      IssueCode::AuthorAndRepositoryCounterSignaturesNotSupported => {
        Self::AuthorAndRepositoryCounterSignaturesNotSupported
      }
      IssueCode::OnlySignatureFormatVersion1Supported => {
        Self::OnlySignatureFormatVersion1Supported
      }
      IssueCode::AuthorCounterSignaturesNotSupported => {
        Self::AuthorCounterSignaturesNotSupported
      }
      IssueCode::PackageIsNotSigned => Self::PackageIsNotSigned,
      IssueCode::PackageIsSignedWithUnauthorizedCertificate => decode_payload(
        code,
        data,
        Self::PackageIsSignedWithUnauthorizedCertificate,
      ),
      IssueCode::SymbolChecksumDoesNotMatch => {
        decode_payload(code, data, Self::SymbolChecksumDoesNotMatch)
      }
      IssueCode::SymbolMatchingAssemblyNotFound => {
        Self::SymbolMatchingAssemblyNotFound
      }
      IssueCode::SymbolPdbIsNotPortable => {
        decode_payload(code, data, Self::SymbolPdbIsNotPortable)
      }
    }
  }

  fn unrecognized(code: i32, data: Option<&str>) -> Self {
    Self::Unknown(Some(UnrecognizedIssue {
      code,
      data: data.map(str::to_owned),
    }))
  }

  /// The payload to persist for this issue, or `None` for kinds that carry
  /// no data.
  pub fn persisted_data(&self) -> Option<String> {
    match self {
      Self::ClientSigningVerificationFailure(d) => Some(canonical_json(d)),
      Self::PackageIsSignedWithUnauthorizedCertificate(d) => {
        Some(canonical_json(d))
      }
      Self::SymbolChecksumDoesNotMatch(d) | Self::SymbolPdbIsNotPortable(d) => {
        Some(canonical_json(d))
      }
      _ => None,
    }
  }

  /// Normalized encoding of the payload used for equality during
  /// deduplication. Object keys are sorted; data-less kinds encode as `{}`.
  pub fn canonical_data(&self) -> String {
    self.persisted_data().unwrap_or_else(|| "{}".to_owned())
  }

  fn dedup_key(&self) -> (IssueCode, String) { (self.code(), self.canonical_data()) }
}

fn decode_payload<T: DeserializeOwned>(
  code: i32,
  data: Option<&str>,
  wrap: impl FnOnce(T) -> ValidationIssue,
) -> ValidationIssue {
  let Some(raw) = data else {
    tracing::warn!(code, "validation issue is missing its data payload");
    return ValidationIssue::unrecognized(code, data);
  };
  match serde_json::from_str::<T>(raw) {
    Ok(payload) => wrap(payload),
    Err(error) => {
      tracing::warn!(code, %error, "malformed validation issue data");
      ValidationIssue::unrecognized(code, data)
    }
  }
}

/// `serde_json::Value` keeps object keys in a sorted map, so going through
/// it gives an encoding independent of field order.
fn canonical_json<T: Serialize>(payload: &T) -> String {
  serde_json::to_value(payload)
    .map(|v| v.to_string())
    .unwrap_or_default()
}

/// Drop issues whose `(code, canonical data)` was already seen, keeping the
/// first occurrence and the relative order of survivors.
pub fn dedupe(issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
  let mut seen = HashSet::new();
  issues
    .into_iter()
    .filter(|issue| seen.insert(issue.dedup_key()))
    .collect()
}

// ─── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for ValidationIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unknown(_) => {
        f.write_str("There was an unknown failure when validating your package.")
      }
      Self::PackageIsSigned => f.write_str(
        "This package could not be published since it is signed. Signed \
         packages are not accepted at this moment.",
      ),
      Self::ClientSigningVerificationFailure(d) => {
        write!(f, "{}: {}", d.client_code, d.client_message)
      }
      Self::PackageIsZip64 => f.write_str("Zip64 packages are not supported."),
      Self::OnlyAuthorSignaturesSupported => f.write_str(
        "Signed packages must only have an author signature. Other signature \
         types are not supported.",
      ),
      Self::AuthorAndRepositoryCounterSignaturesNotSupported => f.write_str(
        "Author countersignatures and repository countersignatures are not \
         supported.",
      ),
      Self::OnlySignatureFormatVersion1Supported => {
        f.write_str("Only signature format version 1 is supported.")
      }
      Self::AuthorCounterSignaturesNotSupported => {
        f.write_str("Author countersignatures are not supported.")
      }
      Self::PackageIsNotSigned => {
        f.write_str("This package must be signed with a registered certificate.")
      }
      Self::PackageIsSignedWithUnauthorizedCertificate(d) => write!(
        f,
        "The package was signed, but the signing certificate (SHA-1 \
         thumbprint {}) is not associated with your account.",
        d.sha1_thumbprint
      ),
      Self::SymbolChecksumDoesNotMatch(d) => write!(
        f,
        "The checksum does not match for the dll(s) and corresponding pdb(s): {}",
        d.assembly_file_name
      ),
      Self::SymbolMatchingAssemblyNotFound => f.write_str(
        "The symbols package contains pdb(s) whose matching dll(s) are not in \
         the package.",
      ),
      Self::SymbolPdbIsNotPortable(d) => write!(
        f,
        "The symbols package contains one or more pdbs that are not portable: {}",
        d.assembly_file_name
      ),
    }
  }
}
