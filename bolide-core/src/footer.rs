use std::collections::BTreeMap;

use bolide_dependencies::either::Either;
use bolide_dependencies::{either, url};

use crate::error::BolideResult;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default)]
pub struct FooterData {
    pub cols: Vec<String>,
    #[serde(flatten)]
    pub rows: BTreeMap<String, Vec<FooterRow>>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct FooterRow {
    pub title: String,
    #[serde(with = "either::serde_untagged")]
    pub url: Either<url::Url, std::path::PathBuf>,
    #[serde(default)]
    pub bold: bool,
}

impl FooterRow {
    pub fn url(&self) -> BolideResult<String> {
        match &self.url {
            Either::Left(url) => Ok(url.to_string()),
            Either::Right(path) => Ok(path.to_string_lossy().to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn footer_rows_take_absolute_and_relative_urls() {
        let data = r#"{
            "cols": ["Meta"],
            "Meta": [
                { "title": "Source", "url": "https://github.com/example/bolide" },
                { "title": "Inbox", "url": "/notifications", "bold": true }
            ]
        }"#;
        let data: FooterData = serde_json::from_str(data).unwrap();
        assert_eq!(data.cols, vec!["Meta".to_string()]);
        let rows = &data.rows["Meta"];
        assert_eq!(rows[0].url().unwrap(), "https://github.com/example/bolide");
        assert_eq!(rows[1].url().unwrap(), "/notifications");
        assert!(rows[1].bold);
        assert!(!rows[0].bold);
    }
}
