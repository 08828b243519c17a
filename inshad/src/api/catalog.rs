//! Catalog loading: styles, schools, rhythms, voices
//!
//! Read-only reference data served by the backend. Styles/schools/rhythms
//! are public; the voices endpoint requires a session token because the
//! backend proxies provider catalogs.

use super::client::{ApiClient, ApiError};
use inshad_common::api::{CulturalStyle, RhythmSchool, RhythmTemplate, Voice};

/// Query filters for the voices endpoint.
///
/// Keys mirror what the backend reads: provider, lang, dialect, scope,
/// support, catalog. Defaults match the Arabic-first filtering of the
/// reference client.
#[derive(Debug, Clone)]
pub struct VoiceQuery {
    pub provider: String,
    pub lang: String,
    pub dialect: Option<String>,
    /// Include community voices alongside the account's own
    pub all_scopes: bool,
    /// Only voices verified to support the requested language
    pub verified_support: bool,
    /// Include the provider's shared catalog
    pub include_catalog: bool,
}

impl Default for VoiceQuery {
    fn default() -> Self {
        Self {
            provider: "elevenlabs".to_string(),
            lang: "ar".to_string(),
            dialect: None,
            all_scopes: true,
            verified_support: true,
            include_catalog: false,
        }
    }
}

impl VoiceQuery {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("provider", self.provider.clone()),
            ("lang", self.lang.clone()),
            (
                "scope",
                if self.all_scopes { "all" } else { "own" }.to_string(),
            ),
        ];
        if let Some(dialect) = &self.dialect {
            query.push(("dialect", dialect.clone()));
        }
        if self.verified_support {
            query.push(("support", "1".to_string()));
        }
        if self.include_catalog {
            query.push(("catalog", "1".to_string()));
        }
        query
    }
}

impl ApiClient {
    /// List cultural styles
    pub async fn styles(&self) -> Result<Vec<CulturalStyle>, ApiError> {
        self.get_json("/styles/").await
    }

    /// List rhythm schools
    pub async fn schools(&self) -> Result<Vec<RhythmSchool>, ApiError> {
        self.get_json("/schools/").await
    }

    /// List rhythm templates, optionally restricted to one school
    pub async fn rhythms(&self, school: Option<&str>) -> Result<Vec<RhythmTemplate>, ApiError> {
        match school {
            Some(key) => {
                self.get_json_with_query("/rhythms/", &[("school", key.to_string())])
                    .await
            }
            None => self.get_json("/rhythms/").await,
        }
    }

    /// Find a single rhythm template by key
    pub async fn find_rhythm(&self, rhythm_key: &str) -> Result<Option<RhythmTemplate>, ApiError> {
        let all = self.rhythms(None).await?;
        Ok(all.into_iter().find(|r| r.rhythm_key == rhythm_key))
    }

    /// List voices for the given provider/filters
    pub async fn voices(&self, query: &VoiceQuery) -> Result<Vec<Voice>, ApiError> {
        self.get_json_with_query("/voices/", &query.to_query()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(query: &VoiceQuery) -> Vec<&'static str> {
        query.to_query().into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_default_voice_query() {
        let q = VoiceQuery::default();
        let pairs = q.to_query();
        assert!(pairs.contains(&("provider", "elevenlabs".to_string())));
        assert!(pairs.contains(&("lang", "ar".to_string())));
        assert!(pairs.contains(&("scope", "all".to_string())));
        assert!(pairs.contains(&("support", "1".to_string())));
        assert!(!keys(&q).contains(&"dialect"));
        assert!(!keys(&q).contains(&"catalog"));
    }

    #[test]
    fn test_voice_query_with_dialect_and_catalog() {
        let q = VoiceQuery {
            dialect: Some("najdi".to_string()),
            include_catalog: true,
            verified_support: false,
            ..VoiceQuery::default()
        };
        let pairs = q.to_query();
        assert!(pairs.contains(&("dialect", "najdi".to_string())));
        assert!(pairs.contains(&("catalog", "1".to_string())));
        assert!(!keys(&q).contains(&"support"));
    }
}
