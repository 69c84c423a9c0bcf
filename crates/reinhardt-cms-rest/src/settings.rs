//! Settings for the CMS REST layer
//!
//! All keys are optional; missing ones take the defaults below.
//!
//! ```toml
//! language_code = "en"
//! languages = ["en", "de"]
//! site_id = 1
//! page_detail_view = "api:page-detail"
//! serializer_cache = "entity_type_and_fields"
//! ```

use crate::error::{CmsError, CmsResult};
use crate::models::SiteId;
use serde::{Deserialize, Serialize};

/// How the generic serializer cache is keyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeying {
	/// One serializer per entity type; field arguments of later calls are
	/// ignored on a hit
	EntityType,
	/// One serializer per entity type and normalized field spec
	#[default]
	EntityTypeAndFields,
}

/// REST layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsRestSettings {
	/// Default language used when a request names none or an unknown one
	pub language_code: String,
	/// Configured languages
	pub languages: Vec<String>,
	/// Site served by single-site deployments
	pub site_id: SiteId,
	/// Route name used to build page detail URLs
	pub page_detail_view: String,
	/// Serializer cache keying
	pub serializer_cache: CacheKeying,
}

impl Default for CmsRestSettings {
	fn default() -> Self {
		Self {
			language_code: "en".to_string(),
			languages: vec!["en".to_string()],
			site_id: 1,
			page_detail_view: "api:page-detail".to_string(),
			serializer_cache: CacheKeying::default(),
		}
	}
}

impl CmsRestSettings {
	/// Parse and validate settings from TOML
	pub fn from_toml_str(source: &str) -> CmsResult<Self> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Check internal consistency
	///
	/// # Errors
	///
	/// [`CmsError::Settings`] when no languages are configured or the default
	/// language is not among them.
	pub fn validate(&self) -> CmsResult<()> {
		if self.languages.is_empty() {
			return Err(CmsError::Settings(
				"at least one language must be configured".to_string(),
			));
		}
		if !self.languages.contains(&self.language_code) {
			return Err(CmsError::Settings(format!(
				"default language '{}' is not in languages {:?}",
				self.language_code, self.languages
			)));
		}
		if self.page_detail_view.is_empty() {
			return Err(CmsError::Settings(
				"page_detail_view must not be empty".to_string(),
			));
		}
		Ok(())
	}

	/// The requested language when configured, otherwise the default
	pub fn resolve_language<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
		match requested {
			Some(language) if self.languages.iter().any(|l| l == language) => language,
			Some(language) => {
				tracing::debug!(
					requested = language,
					fallback = %self.language_code,
					"unknown language requested, using default"
				);
				&self.language_code
			}
			None => &self.language_code,
		}
	}
}
