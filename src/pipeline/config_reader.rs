use std::fs;

use crate::pipeline::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "stateColumn")]
    pub state_column: Option<String>,
    #[serde(rename = "preferenceColumn")]
    pub preference_column: Option<String>,
    #[serde(rename = "likelyColumn")]
    pub likely_column: Option<String>,
    #[serde(rename = "likelyFrom")]
    pub likely_from: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl ResponseSource {
    pub fn format(&self) -> PipelineResult<ResponseFormat> {
        match self.provider.as_str() {
            "csv" => Ok(ResponseFormat::Csv),
            "excel" | "xlsx" => Ok(ResponseFormat::Excel),
            x => whatever!("Provider not implemented {:?}", x),
        }
    }

    pub fn columns(&self) -> PipelineResult<ResponseColumns> {
        let default = ResponseColumns::default();
        let likely_from = match self.likely_from.as_deref() {
            None | Some("intent") => LikelySource::IntentCode,
            Some("flag") => LikelySource::Flag,
            Some(x) => whatever!("Cannot use likelyFrom {:?}: expected intent or flag", x),
        };
        Ok(ResponseColumns {
            state: self.state_column.clone().unwrap_or(default.state),
            preference: self.preference_column.clone().unwrap_or(default.preference),
            likely: self.likely_column.clone().unwrap_or(default.likely),
            likely_from,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Sources {
    pub responses: ResponseSource,
    #[serde(rename = "electionResults")]
    pub election_results: String,
    pub classification: Option<String>,
    #[serde(rename = "turnoutPrior")]
    pub turnout_prior: Option<String>,
    #[serde(rename = "vepCurrent")]
    pub vep_current: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRules {
    #[serde(rename = "unsureAs")]
    pub unsure_as: Option<String>,
    #[serde(rename = "sampleRatio")]
    pub sample_ratio: Option<String>,
    pub rho: Option<f64>,
    #[serde(rename = "minSampleRatio")]
    pub min_sample_ratio: Option<f64>,
    #[serde(rename = "strictJoin")]
    pub strict_join: Option<bool>,
    pub subpopulation: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub sources: Sources,
    #[serde(default)]
    pub rules: RunRules,
}

pub fn read_config(path: &str) -> PipelineResult<RunConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RunConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> PipelineResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let config: RunConfig = serde_json::from_str(
            r#"{
              "outputSettings": {},
              "sources": {
                "responses": { "provider": "excel", "filePath": "ces.xlsx", "likelyFrom": "flag" },
                "electionResults": "results.csv"
              }
            }"#,
        )
        .unwrap();
        assert_eq!(config.output_settings.output_directory, None);
        assert_eq!(config.rules, RunRules::default());
        assert_eq!(config.sources.responses.format().unwrap(), ResponseFormat::Excel);
        let columns = config.sources.responses.columns().unwrap();
        assert_eq!(columns.likely_from, LikelySource::Flag);
        assert_eq!(columns.state, "inputstate");
    }

    #[test]
    fn unknown_provider() {
        let source = ResponseSource {
            provider: "dominion".to_string(),
            file_path: "x".to_string(),
            state_column: None,
            preference_column: None,
            likely_column: None,
            likely_from: None,
            excel_worksheet_name: None,
        };
        assert!(source.format().is_err());
    }
}
