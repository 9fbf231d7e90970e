use std::ops::RangeInclusive;
use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::parser::labels::{default_lesson_labels, default_video_labels};
use crate::parser::select::Criteria;

const ENV_PREFIX: &str = "MDCONV";

/// Where the target text is looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Labelled headings only.
    Headings,
    /// `<details>` toggles only.
    Toggles,
    /// Headings, then toggles when no heading matched.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub video_labels: Vec<String>,
    pub lesson_labels: Vec<String>,
    pub min_level: usize,
    pub max_level: usize,
    pub strategy: Strategy,
    pub video_toggle: String,
    pub lesson_toggle: String,
    pub chunk: bool,
    pub target_chars: usize,
    pub overlap_chars: usize,
    pub strip_emphasis: bool,
    pub extract_tables: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            video_labels: default_video_labels(),
            lesson_labels: default_lesson_labels(),
            min_level: 2,
            max_level: 4,
            strategy: Strategy::Auto,
            video_toggle: "Videó szövege".to_string(),
            lesson_toggle: "Lecke szövege".to_string(),
            chunk: true,
            target_chars: 5500,
            overlap_chars: 400,
            strip_emphasis: false,
            extract_tables: true,
        }
    }
}

impl Settings {
    /// Defaults, then the optional TOML file, then `MDCONV_*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConvertError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("video_labels")
                .with_list_parse_key("lesson_labels"),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.tidy_labels();
        Ok(settings)
    }

    /// Drop blank phrases and surrounding whitespace.
    pub fn tidy_labels(&mut self) {
        for labels in [&mut self.video_labels, &mut self.lesson_labels] {
            labels.retain(|l| !l.trim().is_empty());
            for label in labels.iter_mut() {
                *label = label.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        let invalid = |msg: String| -> Result<(), ConvertError> { Err(ConvertError::InvalidSettings(msg)) };
        if self.video_labels.is_empty() {
            return invalid("video_labels is empty".into());
        }
        if self.lesson_labels.is_empty() {
            return invalid("lesson_labels is empty".into());
        }
        if self.min_level == 0 || self.min_level > self.max_level {
            return invalid(format!(
                "heading levels {}..={} must satisfy 1 <= min <= max",
                self.min_level, self.max_level
            ));
        }
        if self.target_chars == 0 {
            return invalid("target_chars must be positive".into());
        }
        if self.overlap_chars >= self.target_chars {
            return invalid(format!(
                "overlap_chars ({}) must be smaller than target_chars ({})",
                self.overlap_chars, self.target_chars
            ));
        }
        Ok(())
    }

    pub fn levels(&self) -> RangeInclusive<usize> {
        self.min_level..=self.max_level
    }

    pub fn criteria(&self) -> Criteria<'_> {
        Criteria {
            video: &self.video_labels,
            lesson: &self.lesson_labels,
            levels: self.levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.levels(), 2..=4);
        assert_eq!(s.video_labels.first().map(String::as_str), Some("videó szöveg"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut s = Settings::default();
        s.overlap_chars = s.target_chars;
        assert!(matches!(s.validate(), Err(ConvertError::InvalidSettings(_))));

        let mut s = Settings::default();
        s.min_level = 5;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.lesson_labels.clear();
        assert!(s.validate().is_err());
    }

    #[test]
    fn tidy_drops_blank_labels() {
        let mut s = Settings::default();
        s.video_labels = vec!["  videó ".into(), "".into(), "   ".into()];
        s.tidy_labels();
        assert_eq!(s.video_labels, vec!["videó"]);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "target_chars = 1200\nstrategy = \"toggles\"\nlesson_labels = [\"tananyag\", \" \"]"
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.target_chars, 1200);
        assert_eq!(s.strategy, Strategy::Toggles);
        assert_eq!(s.lesson_labels, vec!["tananyag"]);
        assert_eq!(s.overlap_chars, 400);
    }
}
