//! Core types and vocabulary for the scribe transcription client.
//!
//! This crate defines the vocabulary of the system. The wire format lives
//! in `scribe-eventstream` and the moving parts in `scribe-client`; both
//! depend on this crate and speak its types. No I/O lives here.
//!
//! # Structure
//!
//! - [`error`]       — [`ScribeError`], [`ServiceException`], [`Result<T>`] alias
//! - [`credentials`] — [`Credentials`] and [`ProvideCredentials`] sources
//! - [`request`]     — [`StartTranscription`] DTO and its header mapping
//! - [`transcript`]  — [`TranscriptEvent`] JSON model

mod credentials;
mod error;
mod request;
mod transcript;

// --- error
pub use error::{ExceptionKind, Result, ScribeError, ServiceException};

// --- credentials
pub use credentials::{Credentials, EnvCredentials, ProvideCredentials, StaticCredentials};

// --- request
pub use request::{
    // ---
    ContentIdentificationType,
    ContentRedactionType,
    LanguageCode,
    MediaEncoding,
    PartialResultsStability,
    PiiEntityType,
    StartTranscription,
    VocabularyFilterMethod,
};

// --- transcript
pub use transcript::{
    // ---
    Alternative,
    Entity,
    Item,
    LanguageWithScore,
    Transcript,
    TranscriptEvent,
    TranscriptResult,
};
