//! The case handed to the engine: letter, optional property caption and the
//! ordered evidence list. Built entirely by the caller and only ever borrowed.

use serde::{Deserialize, Serialize};

use crate::error::PacketError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    pub letter_text: String,
    #[serde(default)]
    pub property: Option<PropertySummary>,
    #[serde(default)]
    pub exhibits: Vec<Exhibit>,
}

impl CaseDocument {
    pub fn new(letter_text: impl Into<String>) -> Self {
        Self {
            letter_text: letter_text.into(),
            property: None,
            exhibits: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertySummary) -> Self {
        self.property = Some(property);
        self
    }

    pub fn with_exhibit(mut self, exhibit: Exhibit) -> Self {
        self.exhibits.push(exhibit);
        self
    }

    /// Parses a case from JSON. A missing or `null` `letterText` is rejected;
    /// an empty string is fine.
    pub fn from_json(json: &str) -> Result<Self, PacketError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub address: String,
    #[serde(default)]
    pub requested_value: Option<u64>,
}

impl PropertySummary {
    /// `$1,234,567`, or `Not Specified` when no value was requested.
    pub fn requested_value_label(&self) -> String {
        match self.requested_value {
            Some(value) => format!("${}", group_thousands(value)),
            None => "Not Specified".to_string(),
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Title, narrative and a bounded photo.
    #[default]
    Photo,
    /// Image-dominant page; the narrative is only shown as a fallback.
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exhibit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "displayType")]
    pub display_mode: DisplayMode,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Exhibit {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        mode: DisplayMode,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            display_mode: mode,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// `EVIDENCE` stands in for a blank title.
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            "EVIDENCE".to_string()
        } else {
            title.to_uppercase()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(with = "base64_bytes")]
    pub image_bytes: Vec<u8>,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl Attachment {
    pub fn new(image_bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            image_bytes,
            mime_type: mime_type.into(),
        }
    }
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

// Bytes travel as standard base64, optionally wrapped in a `data:` URI.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let payload = match raw.split_once("base64,") {
            Some((_, data)) => data,
            None => raw.as_str(),
        };
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn parses_case_json_with_data_uri_attachment() {
        let payload = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
        let json = format!(
            r#"{{
                "letterText": "To the Appraisal Review Board",
                "property": {{ "address": "12 Elm St", "requestedValue": 310000 }},
                "exhibits": [
                    {{
                        "title": "Roof",
                        "description": "Hail damage",
                        "displayType": "document",
                        "attachments": [{{
                            "imageBytes": "data:image/png;base64,{payload}",
                            "mimeType": "image/png"
                        }}]
                    }},
                    {{ "title": "Kitchen" }}
                ]
            }}"#
        );
        let case = CaseDocument::from_json(&json).expect("parse");
        assert_eq!(case.exhibits.len(), 2);
        assert_eq!(case.exhibits[0].display_mode, DisplayMode::Document);
        assert_eq!(case.exhibits[0].attachments[0].image_bytes, vec![1, 2, 3]);
        assert_eq!(case.exhibits[1].display_mode, DisplayMode::Photo);
        assert!(case.exhibits[1].attachments.is_empty());
        let property = case.property.expect("property");
        assert_eq!(property.requested_value_label(), "$310,000");
    }

    #[test]
    fn missing_or_null_letter_is_rejected() {
        let err = CaseDocument::from_json(r#"{ "exhibits": [] }"#).expect_err("missing");
        assert!(matches!(err, PacketError::InvalidCase(_)));
        let err = CaseDocument::from_json(r#"{ "letterText": null }"#).expect_err("null");
        assert!(matches!(err, PacketError::InvalidCase(_)));
        let case = CaseDocument::from_json(r#"{ "letterText": "" }"#).expect("empty ok");
        assert!(case.letter_text.is_empty());
    }

    #[test]
    fn bad_base64_is_rejected() {
        let json =
            r#"{ "letterText": "x", "exhibits": [ { "attachments": [ { "imageBytes": "%%%" } ] } ] }"#;
        assert!(CaseDocument::from_json(json).is_err());
    }

    #[test]
    fn value_labels_and_titles() {
        let summary = PropertySummary {
            address: "1 Main".to_string(),
            requested_value: None,
        };
        assert_eq!(summary.requested_value_label(), "Not Specified");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(Exhibit::new("  ", "", DisplayMode::Photo).display_title(), "EVIDENCE");
        assert_eq!(
            Exhibit::new("Foundation crack", "", DisplayMode::Photo).display_title(),
            "FOUNDATION CRACK"
        );
    }

    #[test]
    fn round_trips_through_json() {
        let case = CaseDocument::new("Letter")
            .with_exhibit(
                Exhibit::new("A", "B", DisplayMode::Document)
                    .with_attachment(Attachment::new(vec![9, 8, 7], "image/png")),
            );
        let json = serde_json::to_string(&case).expect("serialize");
        assert!(json.contains("\"displayMode\":\"document\""));
        assert_eq!(CaseDocument::from_json(&json).expect("parse"), case);
    }
}
