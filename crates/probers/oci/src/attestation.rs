//! Turning attestation envelopes into documents.
//!
//! Attestations are DSSE envelopes wrapping an in-toto statement. The
//! statement's predicate type decides the document format; the predicate
//! body becomes the document.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use docprobe_core::{Document, Error, Format, FormatList, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Payload type of in-toto statements inside a DSSE envelope.
pub const INTOTO_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// Media type of registry layers holding a DSSE envelope.
pub const DSSE_ENVELOPE_MEDIA_TYPE: &str = "application/vnd.dsse.envelope.v1+json";

/// A DSSE envelope as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Type of the payload (e.g. in-toto statement).
    pub payload_type: String,
    /// Base64 encoded payload.
    pub payload: String,
    /// Envelope signatures. Not verified by docprobe.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// A DSSE signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Key identifier.
    #[serde(default)]
    pub keyid: String,
    /// Base64 encoded signature.
    pub sig: String,
}

impl Envelope {
    /// Create an unsigned envelope around an already encoded payload.
    #[must_use]
    pub fn new(payload_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            payload_type: payload_type.into(),
            payload: payload.into(),
            signatures: Vec::new(),
        }
    }

    /// Create an unsigned in-toto envelope from raw statement bytes.
    #[must_use]
    pub fn intoto(statement: &[u8]) -> Self {
        Self::new(INTOTO_PAYLOAD_TYPE, STANDARD.encode(statement))
    }
}

/// An in-toto statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement schema identifier.
    #[serde(rename = "_type", default)]
    pub statement_type: String,
    /// Artifacts the statement is about.
    #[serde(default)]
    pub subject: Vec<Subject>,
    /// Predicate type URI.
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    /// Predicate body.
    #[serde(default)]
    pub predicate: serde_json::Value,
}

/// A statement subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject name.
    #[serde(default)]
    pub name: String,
    /// Digests by algorithm.
    #[serde(default)]
    pub digest: std::collections::BTreeMap<String, String>,
}

/// Decode the statement carried by an envelope.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the payload is not valid base64 or not an
/// in-toto statement.
pub fn decode_statement(envelope: &Envelope) -> Result<Statement> {
    let payload = STANDARD
        .decode(envelope.payload.trim())
        .map_err(|e| Error::decode("attestation payload", e.to_string()))?;
    serde_json::from_slice(&payload).map_err(|e| Error::decode("in-toto statement", e.to_string()))
}

/// Serialize a predicate as JSON indented with four spaces.
fn render_predicate(predicate: &serde_json::Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    predicate
        .serialize(&mut serializer)
        .map_err(|e| Error::decode("predicate", e.to_string()))?;
    out.push(b'\n');
    Ok(out)
}

/// Build documents from the envelopes the caller is interested in.
///
/// Envelopes are handled in order. Ones that are not in-toto, carry an
/// unknown predicate type, or whose format is not accepted by `formats` are
/// skipped. Only malformed envelopes fail the call.
///
/// # Errors
///
/// Returns [`Error::Decode`] for envelopes whose payload or statement
/// cannot be decoded.
pub fn filter_attestations<I>(envelopes: I, formats: &FormatList) -> Result<Vec<Document>>
where
    I: IntoIterator<Item = Envelope>,
{
    let mut docs = Vec::new();

    for envelope in envelopes {
        if envelope.payload_type != INTOTO_PAYLOAD_TYPE {
            debug!(payload_type = %envelope.payload_type, "Skipping non in-toto envelope");
            continue;
        }

        let statement = decode_statement(&envelope)?;

        let format = Format::from_predicate_type(&statement.predicate_type);
        if format.is_empty() {
            warn!(
                predicate_type = %statement.predicate_type,
                "Ignoring attached document of unsupported type"
            );
            continue;
        }

        if !formats.accepts(&format) {
            warn!(
                predicate_type = %statement.predicate_type,
                %format,
                "Ignoring attached document not in the requested formats"
            );
            continue;
        }

        let body = render_predicate(&statement.predicate)?;
        docs.push(Document::from_reader(format, body.as_slice())?);
    }

    debug!(count = docs.len(), "Built documents from attestations");
    Ok(docs)
}
