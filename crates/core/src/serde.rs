//! Blank query values such as `?author=&tag=` mean "no filter".

use serde::{de::Error as _, Deserialize, Deserializer};
use uuid::Uuid;

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty()))
}

/// `Option<String>` field where a blank value reads as `None`.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    non_blank(deserializer)
}

/// `Option<Uuid>` field where a blank value reads as `None`; anything else must parse.
pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    non_blank(deserializer)?
        .map(|value| Uuid::parse_str(&value).map_err(D::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Filters {
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        tag: Option<String>,
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        author: Option<Uuid>,
    }

    fn parse(json: &str) -> Result<Filters, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_blank_values_are_none() {
        let filters = parse(r#"{"tag": "  ", "author": ""}"#).unwrap();
        assert_eq!(filters.tag, None);
        assert_eq!(filters.author, None);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let filters = parse("{}").unwrap();
        assert!(filters.tag.is_none() && filters.author.is_none());
    }

    #[test]
    fn test_values_are_trimmed_and_kept() {
        let id = Uuid::new_v4();
        let filters = parse(&format!(r#"{{"tag": " rust ", "author": " {id} "}}"#)).unwrap();
        assert_eq!(filters.tag.as_deref(), Some("rust"));
        assert_eq!(filters.author, Some(id));
    }

    #[test]
    fn test_malformed_uuid_is_rejected() {
        assert!(parse(r#"{"author": "nope"}"#).is_err());
    }
}
