use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque callback URL identifying one in-flight workflow run.
///
/// Doubles as the mailbox key. Never parsed for meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeHandle(String);

impl ResumeHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResumeHandle {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResumeHandle {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// One workflow checkpoint held in the mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum StoredResult {
    Outline(String),
    Article(String),
    GetFeedback(String),
    End(String),
}

/// Field names in the order they are looked up when a body carries more than one.
const CHECKPOINT_KEYS: [&str; 4] = ["outline", "article", "end", "getFeedback"];

impl StoredResult {
    /// Wire name of the checkpoint kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoredResult::Outline(_) => "outline",
            StoredResult::Article(_) => "article",
            StoredResult::GetFeedback(_) => "getFeedback",
            StoredResult::End(_) => "end",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            StoredResult::Outline(text)
            | StoredResult::Article(text)
            | StoredResult::GetFeedback(text)
            | StoredResult::End(text) => text,
        }
    }

    /// Picks the checkpoint carried by a workflow body, if any.
    ///
    /// Only non-empty strings count; `outline` wins over `article`, which wins
    /// over `end`, which wins over `getFeedback`.
    pub fn from_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        CHECKPOINT_KEYS.iter().find_map(|key| {
            let content = object
                .get(*key)
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())?
                .to_string();
            Some(match *key {
                "outline" => StoredResult::Outline(content),
                "article" => StoredResult::Article(content),
                "end" => StoredResult::End(content),
                _ => StoredResult::GetFeedback(content),
            })
        })
    }
}

/// Poll reply: exactly one field set when a result was taken, all null otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointFields {
    pub outline: Option<String>,
    pub article: Option<String>,
    pub get_feedback: Option<String>,
    pub end: Option<String>,
}

impl CheckpointFields {
    pub fn is_empty(&self) -> bool {
        self.outline.is_none()
            && self.article.is_none()
            && self.get_feedback.is_none()
            && self.end.is_none()
    }
}

impl From<Option<StoredResult>> for CheckpointFields {
    fn from(result: Option<StoredResult>) -> Self {
        let mut fields = CheckpointFields::default();
        match result {
            Some(StoredResult::Outline(text)) => fields.outline = Some(text),
            Some(StoredResult::Article(text)) => fields.article = Some(text),
            Some(StoredResult::GetFeedback(url)) => fields.get_feedback = Some(url),
            Some(StoredResult::End(url)) => fields.end = Some(url),
            None => {}
        }
        fields
    }
}

/// A single uploaded file forwarded as the `file` multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Arbitrary form submission bound for a resume handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormSubmission {
    pub fields: Vec<(String, String)>,
    pub file: Option<FileUpload>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// A bare `feedback=true` acknowledgement is forwarded as JSON instead of multipart.
    pub fn is_feedback_ack(&self) -> bool {
        self.field("feedback") == Some("true")
    }
}

/// Reviewer feedback on an outline or article checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub edited_outline: Option<String>,
    #[serde(default)]
    pub edited_article: Option<String>,
}

impl FeedbackSubmission {
    /// Multipart fields sent upstream; empty edits are left out.
    pub(crate) fn into_form(self) -> FormSubmission {
        let mut fields = vec![("feedback".to_string(), self.feedback.unwrap_or_default())];
        if let Some(outline) = self.edited_outline.filter(|text| !text.is_empty()) {
            fields.push(("editedOutline".to_string(), outline));
        }
        if let Some(article) = self.edited_article.filter(|text| !text.is_empty()) {
            fields.push(("editedArticle".to_string(), article));
        }
        FormSubmission { fields, file: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_result_serializes_as_type_and_content() {
        let value = serde_json::to_value(StoredResult::Outline("Draft v1".into())).unwrap();
        assert_eq!(value, json!({"type": "outline", "content": "Draft v1"}));

        let value = serde_json::to_value(StoredResult::GetFeedback("https://sheet".into())).unwrap();
        assert_eq!(value, json!({"type": "getFeedback", "content": "https://sheet"}));
    }

    #[test]
    fn from_body_follows_priority_and_skips_empty_values() {
        let body = json!({"end": "https://drive/doc", "outline": "", "article": "Body"});
        assert_eq!(
            StoredResult::from_body(&body),
            Some(StoredResult::Article("Body".into()))
        );
        assert_eq!(StoredResult::from_body(&json!({"resumeURL": "h1"})), None);
        assert_eq!(StoredResult::from_body(&json!({"outline": 3})), None);
        assert_eq!(StoredResult::from_body(&json!(["outline"])), None);
    }

    #[test]
    fn empty_fields_serialize_with_explicit_nulls() {
        let value = serde_json::to_value(CheckpointFields::from(None)).unwrap();
        assert_eq!(
            value,
            json!({"outline": null, "article": null, "getFeedback": null, "end": null})
        );
    }

    #[test]
    fn feedback_form_omits_blank_edits() {
        let form = FeedbackSubmission {
            feedback: None,
            edited_outline: Some(String::new()),
            edited_article: Some("Edited".into()),
        }
        .into_form();
        assert_eq!(
            form.fields,
            vec![
                ("feedback".to_string(), String::new()),
                ("editedArticle".to_string(), "Edited".to_string()),
            ]
        );
    }
}
