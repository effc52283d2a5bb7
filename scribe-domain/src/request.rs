//! The `StartStreamTranscription` request DTO and its header mapping.
//!
//! Transcribe streaming takes its request parameters as HTTP headers on
//! the initial request, not as a body: every optional field below maps to
//! one `x-amzn-transcribe-*` header. Booleans serialize as `"true"` /
//! `"false"`, numbers as decimal strings, lists comma-joined, enums as
//! their documented wire value.

use crate::error::{Result, ScribeError};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Languages the streaming API accepts, as BCP-47 style codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LanguageCode {
    // ---
    EnUs,
    EnGb,
    EnAu,
    EsUs,
    EsEs,
    FrFr,
    FrCa,
    DeDe,
    ItIt,
    PtBr,
    JaJp,
    KoKr,
    ZhCn,
    HiIn,
    ThTh,
}

impl LanguageCode {
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Self::EnUs => "en-US",
            Self::EnGb => "en-GB",
            Self::EnAu => "en-AU",
            Self::EsUs => "es-US",
            Self::EsEs => "es-ES",
            Self::FrFr => "fr-FR",
            Self::FrCa => "fr-CA",
            Self::DeDe => "de-DE",
            Self::ItIt => "it-IT",
            Self::PtBr => "pt-BR",
            Self::JaJp => "ja-JP",
            Self::KoKr => "ko-KR",
            Self::ZhCn => "zh-CN",
            Self::HiIn => "hi-IN",
            Self::ThTh => "th-TH",
        }
    }
}

// ---

/// Audio container formats the service decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaEncoding {
    // ---
    /// 16-bit signed little-endian PCM, no container.
    #[default]
    Pcm,
    Flac,
    OggOpus,
}

impl MediaEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pcm => "pcm",
            Self::Flac => "flac",
            Self::OggOpus => "ogg-opus",
        }
    }
}

// ---

/// How aggressively partial results are stabilized. Higher stability
/// means fewer revisions at slightly worse latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialResultsStability {
    High,
    Medium,
    Low,
}

impl PartialResultsStability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

// ---

/// What to do with words matched by a vocabulary filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyFilterMethod {
    Remove,
    Mask,
    Tag,
}

impl VocabularyFilterMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Mask => "mask",
            Self::Tag => "tag",
        }
    }
}

// ---

/// Flag PII in the transcript without altering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentIdentificationType {
    Pii,
}

impl ContentIdentificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pii => "PII",
        }
    }
}

// ---

/// Redact PII from the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRedactionType {
    Pii,
}

impl ContentRedactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pii => "PII",
        }
    }
}

// ---

/// PII categories for identification / redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PiiEntityType {
    // ---
    BankAccountNumber,
    BankRouting,
    CreditDebitNumber,
    CreditDebitCvv,
    CreditDebitExpiry,
    Pin,
    Email,
    Address,
    Name,
    Phone,
    Ssn,
    All,
}

impl PiiEntityType {
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Self::BankAccountNumber => "BANK_ACCOUNT_NUMBER",
            Self::BankRouting => "BANK_ROUTING",
            Self::CreditDebitNumber => "CREDIT_DEBIT_NUMBER",
            Self::CreditDebitCvv => "CREDIT_DEBIT_CVV",
            Self::CreditDebitExpiry => "CREDIT_DEBIT_EXPIRY",
            Self::Pin => "PIN",
            Self::Email => "EMAIL",
            Self::Address => "ADDRESS",
            Self::Name => "NAME",
            Self::Phone => "PHONE",
            Self::Ssn => "SSN",
            Self::All => "ALL",
        }
    }
}

// ---------------------------------------------------------------------------
// StartTranscription
// ---------------------------------------------------------------------------

/// Parameters for one streaming transcription session.
///
/// Exactly one language mode must be chosen: a fixed [`language_code`],
/// automatic single-language identification ([`identify_language`] with
/// [`language_options`]), or multi-language identification
/// ([`identify_multiple_languages`]).
///
/// [`language_code`]: Self::language_code
/// [`identify_language`]: Self::identify_language
/// [`language_options`]: Self::language_options
/// [`identify_multiple_languages`]: Self::identify_multiple_languages
#[derive(Debug, Clone)]
pub struct StartTranscription {
    // ---
    pub language_code: Option<LanguageCode>,

    /// Sample rate of the audio in hertz, 8 000 – 48 000.
    pub media_sample_rate_hertz: u32,

    pub media_encoding: MediaEncoding,

    pub vocabulary_name: Option<String>,

    /// Caller-chosen session id; the service generates one when absent.
    pub session_id: Option<String>,

    pub vocabulary_filter_name: Option<String>,

    pub vocabulary_filter_method: Option<VocabularyFilterMethod>,

    pub show_speaker_label: bool,

    pub enable_channel_identification: bool,

    /// Channel count for channel identification (2 is the service max).
    pub number_of_channels: Option<u32>,

    pub enable_partial_results_stabilization: bool,

    pub partial_results_stability: Option<PartialResultsStability>,

    pub content_identification_type: Option<ContentIdentificationType>,

    pub content_redaction_type: Option<ContentRedactionType>,

    pub pii_entity_types: Vec<PiiEntityType>,

    pub language_model_name: Option<String>,

    pub identify_language: bool,

    /// Candidate languages for identification, at least two when set.
    pub language_options: Vec<LanguageCode>,

    pub preferred_language: Option<LanguageCode>,

    pub identify_multiple_languages: bool,

    /// Per-language vocabularies for identification mode.
    pub vocabulary_names: Vec<String>,

    pub vocabulary_filter_names: Vec<String>,
}

// ---

impl StartTranscription {
    // ---

    /// A request for fixed-language transcription; everything else off.
    pub fn new(language: LanguageCode, sample_rate_hertz: u32) -> Self {
        // ---
        Self {
            language_code: Some(language),
            media_sample_rate_hertz: sample_rate_hertz,
            media_encoding: MediaEncoding::Pcm,
            vocabulary_name: None,
            session_id: None,
            vocabulary_filter_name: None,
            vocabulary_filter_method: None,
            show_speaker_label: false,
            enable_channel_identification: false,
            number_of_channels: None,
            enable_partial_results_stabilization: false,
            partial_results_stability: None,
            content_identification_type: None,
            content_redaction_type: None,
            pii_entity_types: Vec::new(),
            language_model_name: None,
            identify_language: false,
            language_options: Vec::new(),
            preferred_language: None,
            identify_multiple_languages: false,
            vocabulary_names: Vec::new(),
            vocabulary_filter_names: Vec::new(),
        }
    }

    // ---

    /// Validate field combinations the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        // ---
        if !(8_000..=48_000).contains(&self.media_sample_rate_hertz) {
            return Err(ScribeError::Configuration(format!(
                "sample rate must be 8000..=48000 Hz, got {}",
                self.media_sample_rate_hertz
            )));
        }

        let modes = [
            self.language_code.is_some(),
            self.identify_language,
            self.identify_multiple_languages,
        ]
        .iter()
        .filter(|&&on| on)
        .count();
        if modes != 1 {
            return Err(ScribeError::Configuration(
                "exactly one of language_code, identify_language, \
                 identify_multiple_languages must be set"
                    .into(),
            ));
        }

        if (self.identify_language || self.identify_multiple_languages)
            && self.language_options.len() < 2
        {
            return Err(ScribeError::Configuration(
                "language identification needs at least two language_options".into(),
            ));
        }

        if self.number_of_channels.is_some() && !self.enable_channel_identification {
            return Err(ScribeError::Configuration(
                "number_of_channels requires enable_channel_identification".into(),
            ));
        }

        if self.partial_results_stability.is_some() && !self.enable_partial_results_stabilization {
            return Err(ScribeError::Configuration(
                "partial_results_stability requires enable_partial_results_stabilization".into(),
            ));
        }

        if self.content_identification_type.is_some() && self.content_redaction_type.is_some() {
            return Err(ScribeError::Configuration(
                "content identification and redaction are mutually exclusive".into(),
            ));
        }

        Ok(())
    }

    // ---

    /// Render the `x-amzn-transcribe-*` header set for the initial request.
    ///
    /// Only fields that are set are emitted; booleans are emitted only
    /// when true. Order is fixed so the signed header set is stable.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        // ---
        let mut out: Vec<(&'static str, String)> = Vec::new();

        if let Some(lang) = self.language_code {
            out.push(("x-amzn-transcribe-language-code", lang.as_str().into()));
        }
        out.push((
            "x-amzn-transcribe-sample-rate",
            self.media_sample_rate_hertz.to_string(),
        ));
        out.push((
            "x-amzn-transcribe-media-encoding",
            self.media_encoding.as_str().into(),
        ));
        if let Some(name) = &self.vocabulary_name {
            out.push(("x-amzn-transcribe-vocabulary-name", name.clone()));
        }
        if let Some(id) = &self.session_id {
            out.push(("x-amzn-transcribe-session-id", id.clone()));
        }
        if let Some(name) = &self.vocabulary_filter_name {
            out.push(("x-amzn-transcribe-vocabulary-filter-name", name.clone()));
        }
        if let Some(method) = self.vocabulary_filter_method {
            out.push((
                "x-amzn-transcribe-vocabulary-filter-method",
                method.as_str().into(),
            ));
        }
        if self.show_speaker_label {
            out.push(("x-amzn-transcribe-show-speaker-label", "true".into()));
        }
        if self.enable_channel_identification {
            out.push((
                "x-amzn-transcribe-enable-channel-identification",
                "true".into(),
            ));
        }
        if let Some(n) = self.number_of_channels {
            out.push(("x-amzn-transcribe-number-of-channels", n.to_string()));
        }
        if self.enable_partial_results_stabilization {
            out.push((
                "x-amzn-transcribe-enable-partial-results-stabilization",
                "true".into(),
            ));
        }
        if let Some(stability) = self.partial_results_stability {
            out.push((
                "x-amzn-transcribe-partial-results-stability",
                stability.as_str().into(),
            ));
        }
        if let Some(ident) = self.content_identification_type {
            out.push((
                "x-amzn-transcribe-content-identification-type",
                ident.as_str().into(),
            ));
        }
        if let Some(redaction) = self.content_redaction_type {
            out.push((
                "x-amzn-transcribe-content-redaction-type",
                redaction.as_str().into(),
            ));
        }
        if !self.pii_entity_types.is_empty() {
            out.push((
                "x-amzn-transcribe-pii-entity-types",
                join(self.pii_entity_types.iter().map(|t| t.as_str())),
            ));
        }
        if let Some(name) = &self.language_model_name {
            out.push(("x-amzn-transcribe-language-model-name", name.clone()));
        }
        if self.identify_language {
            out.push(("x-amzn-transcribe-identify-language", "true".into()));
        }
        if !self.language_options.is_empty() {
            out.push((
                "x-amzn-transcribe-language-options",
                join(self.language_options.iter().map(|l| l.as_str())),
            ));
        }
        if let Some(lang) = self.preferred_language {
            out.push((
                "x-amzn-transcribe-preferred-language",
                lang.as_str().into(),
            ));
        }
        if self.identify_multiple_languages {
            out.push((
                "x-amzn-transcribe-identify-multiple-languages",
                "true".into(),
            ));
        }
        if !self.vocabulary_names.is_empty() {
            out.push((
                "x-amzn-transcribe-vocabulary-names",
                join(self.vocabulary_names.iter().map(String::as_str)),
            ));
        }
        if !self.vocabulary_filter_names.is_empty() {
            out.push((
                "x-amzn-transcribe-vocabulary-filter-names",
                join(self.vocabulary_filter_names.iter().map(String::as_str)),
            ));
        }

        out
    }
}

// ---

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(",")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    // ---

    #[test]
    fn minimal_request_maps_three_headers() {
        // ---
        let req = StartTranscription::new(LanguageCode::EnUs, 16_000);
        req.validate().unwrap();

        let headers = req.to_headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(
            header(&headers, "x-amzn-transcribe-language-code"),
            Some("en-US")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-sample-rate"),
            Some("16000")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-media-encoding"),
            Some("pcm")
        );
    }

    // ---

    #[test]
    fn booleans_and_lists_serialize() {
        // ---
        let mut req = StartTranscription::new(LanguageCode::DeDe, 8_000);
        req.show_speaker_label = true;
        req.enable_partial_results_stabilization = true;
        req.partial_results_stability = Some(PartialResultsStability::High);
        req.content_redaction_type = Some(ContentRedactionType::Pii);
        req.pii_entity_types = vec![PiiEntityType::Ssn, PiiEntityType::CreditDebitNumber];
        req.validate().unwrap();

        let headers = req.to_headers();
        assert_eq!(
            header(&headers, "x-amzn-transcribe-show-speaker-label"),
            Some("true")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-partial-results-stability"),
            Some("high")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-content-redaction-type"),
            Some("PII")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-pii-entity-types"),
            Some("SSN,CREDIT_DEBIT_NUMBER")
        );
        // Unset booleans are omitted, not sent as "false".
        assert!(header(&headers, "x-amzn-transcribe-identify-language").is_none());
    }

    // ---

    #[test]
    fn identify_language_mode_maps_options() {
        // ---
        let mut req = StartTranscription::new(LanguageCode::EnUs, 16_000);
        req.language_code = None;
        req.identify_language = true;
        req.language_options = vec![LanguageCode::EnUs, LanguageCode::FrFr];
        req.preferred_language = Some(LanguageCode::EnUs);
        req.validate().unwrap();

        let headers = req.to_headers();
        assert_eq!(
            header(&headers, "x-amzn-transcribe-identify-language"),
            Some("true")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-language-options"),
            Some("en-US,fr-FR")
        );
        assert_eq!(
            header(&headers, "x-amzn-transcribe-preferred-language"),
            Some("en-US")
        );
        assert!(header(&headers, "x-amzn-transcribe-language-code").is_none());
    }

    // ---

    #[test]
    fn validate_rejects_bad_combinations() {
        // ---
        let mut req = StartTranscription::new(LanguageCode::EnUs, 4_000);
        assert!(req.validate().is_err()); // sample rate too low
        req.media_sample_rate_hertz = 16_000;

        // Two language modes at once.
        req.identify_language = true;
        req.language_options = vec![LanguageCode::EnUs, LanguageCode::FrFr];
        assert!(req.validate().is_err());
        req.identify_language = false;
        req.language_options.clear();

        // Channel count without channel identification.
        req.number_of_channels = Some(2);
        assert!(req.validate().is_err());
        req.enable_channel_identification = true;
        assert!(req.validate().is_ok());

        // Stability without stabilization.
        req.partial_results_stability = Some(PartialResultsStability::Low);
        assert!(req.validate().is_err());
    }
}
