//! Change-tracking metadata shared by tracked-edit node types.
//!
//! Every tracked insertion and deletion carries the same three attributes:
//! a part-unique id, the author, and an ISO-8601 timestamp. Encoding always
//! writes the timestamp with millisecond precision and a trailing `Z`, so a
//! decoded instant re-encodes to the identical attribute string.

use super::error::{ModelError, Result};
use super::props::PropBag;
use crate::xml::XmlElement;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Who made a tracked change, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInformation {
    /// Change id, unique within its document part
    pub id: String,

    /// Author who made the change
    pub author: String,

    /// Instant of the change
    pub date: DateTime<Utc>,
}

impl ChangeInformation {
    pub fn new<I: Into<String>, A: Into<String>>(id: I, author: A, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            date,
        }
    }

    /// Read id/author/date attributes from a tracked-change element.
    ///
    /// Attributes are matched on their local name, so both `w:id` and bare
    /// `id` spellings are accepted. A missing attribute or an unparsable
    /// date is a [`ModelError::MalformedChangeMetadata`].
    pub fn from_xml(el: &XmlElement) -> Result<Self> {
        let id = required_attr(el, "id")?;
        let author = required_attr(el, "author")?;
        let raw_date = required_attr(el, "date")?;

        let date = DateTime::parse_from_rfc3339(&raw_date)
            .map_err(|e| {
                ModelError::MalformedChangeMetadata(format!(
                    "<{}> date '{raw_date}' is not a valid timestamp: {e}",
                    el.name
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self { id, author, date })
    }

    /// Reconstruct change metadata from decoded props.
    pub fn from_props(props: &PropBag) -> Result<Self> {
        let id = required_prop(props, "id")?;
        let author = required_prop(props, "author")?;
        let raw_date = required_prop(props, "date")?;

        let date = DateTime::parse_from_rfc3339(&raw_date)
            .map_err(|e| {
                ModelError::MalformedChangeMetadata(format!(
                    "prop date '{raw_date}' is not a valid timestamp: {e}"
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self { id, author, date })
    }

    /// Store the metadata into a prop bag for a decoded node instance.
    pub fn to_props(&self) -> PropBag {
        PropBag::new()
            .with("id", self.id.as_str())
            .with("author", self.author.as_str())
            .with("date", self.date_string())
    }

    /// The attribute encoding of the timestamp: ISO-8601, millisecond
    /// precision, UTC `Z` suffix.
    pub fn date_string(&self) -> String {
        self.date.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn required_attr(el: &XmlElement, local: &str) -> Result<String> {
    el.attr_local(local).map(str::to_string).ok_or_else(|| {
        ModelError::MalformedChangeMetadata(format!("<{}> is missing the {local} attribute", el.name))
    })
}

fn required_prop(props: &PropBag, key: &str) -> Result<String> {
    props.get_str(key).map(str::to_string).ok_or_else(|| {
        ModelError::MalformedChangeMetadata(format!("change props are missing '{key}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlNode;

    fn element(xml: &str) -> XmlElement {
        XmlNode::parse(xml.as_bytes())
            .unwrap()
            .into_element()
            .unwrap()
    }

    #[test]
    fn test_extract_and_reencode_identical() {
        let el = element(r#"<w:ins w:id="1" w:author="A" w:date="2020-01-01T00:00:00.000Z"/>"#);
        let change = ChangeInformation::from_xml(&el).unwrap();

        assert_eq!(change.id, "1");
        assert_eq!(change.author, "A");
        assert_eq!(change.date_string(), "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_subsecond_precision_round_trips() {
        let el = element(r#"<w:del w:id="3" w:author="B" w:date="2024-11-05T10:30:00.125Z"/>"#);
        let change = ChangeInformation::from_xml(&el).unwrap();

        assert_eq!(change.date_string(), "2024-11-05T10:30:00.125Z");

        let back = ChangeInformation::from_props(&change.to_props()).unwrap();
        assert_eq!(back, change);
    }

    #[test]
    fn test_missing_attribute_is_malformed() {
        let el = element(r#"<w:ins w:id="1" w:date="2020-01-01T00:00:00Z"/>"#);
        assert!(matches!(
            ChangeInformation::from_xml(&el),
            Err(ModelError::MalformedChangeMetadata(_))
        ));
    }

    #[test]
    fn test_unparsable_date_is_malformed() {
        let el = element(r#"<w:ins w:id="1" w:author="A" w:date="yesterday"/>"#);
        assert!(matches!(
            ChangeInformation::from_xml(&el),
            Err(ModelError::MalformedChangeMetadata(_))
        ));
    }

    #[test]
    fn test_offset_dates_normalize_to_utc() {
        let el = element(r#"<w:ins w:id="1" w:author="A" w:date="2020-06-01T02:00:00+02:00"/>"#);
        let change = ChangeInformation::from_xml(&el).unwrap();
        assert_eq!(change.date_string(), "2020-06-01T00:00:00.000Z");
    }
}
