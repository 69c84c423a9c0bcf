//! Localized page and placeholder serializers
//!
//! Both serializers are bound to one request language at construction, and
//! every localized getter receives that same value.

use crate::error::{CmsError, CmsResult};
use crate::models::{Page, Placeholder};
use crate::source::UrlReverser;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// Page serializer bound to a request language
///
/// Emits, in order: `id, title, placeholders, creation_date, changed_date,
/// publication_date, publication_end_date, in_navigation, template, is_home,
/// languages, parent, site, page_title, menu_title, meta_description, slug,
/// url, path, absolute_url, redirect`.
pub struct PageSerializer {
	language: String,
	reverser: Arc<dyn UrlReverser>,
	detail_view: String,
}

impl PageSerializer {
	/// Create a serializer for `language`, reversing detail URLs via
	/// `detail_view`
	pub fn new(
		language: impl Into<String>,
		reverser: Arc<dyn UrlReverser>,
		detail_view: impl Into<String>,
	) -> Self {
		Self {
			language: language.into(),
			reverser,
			detail_view: detail_view.into(),
		}
	}

	/// The bound request language
	pub fn language(&self) -> &str {
		&self.language
	}

	/// Serialize one page
	pub fn serialize(&self, page: &Page) -> CmsResult<Value> {
		let language = self.language.as_str();
		let mut data = Map::new();

		data.insert("id".to_string(), json!(page.id));
		data.insert("title".to_string(), json!(page.get_title(language)));
		data.insert("placeholders".to_string(), json!(page.placeholders));
		data.insert("creation_date".to_string(), json!(page.creation_date));
		data.insert("changed_date".to_string(), json!(page.changed_date));
		data.insert("publication_date".to_string(), json!(page.publication_date));
		data.insert(
			"publication_end_date".to_string(),
			json!(page.publication_end_date),
		);
		data.insert("in_navigation".to_string(), json!(page.in_navigation));
		data.insert("template".to_string(), json!(page.template));
		data.insert("is_home".to_string(), json!(page.is_home));
		data.insert("languages".to_string(), json!(page.languages));
		data.insert("parent".to_string(), json!(page.parent));
		data.insert("site".to_string(), json!(page.site));
		data.insert("page_title".to_string(), json!(page.get_page_title(language)));
		data.insert("menu_title".to_string(), json!(page.get_menu_title(language)));
		data.insert(
			"meta_description".to_string(),
			json!(page.get_meta_description(language)),
		);
		data.insert("slug".to_string(), json!(page.get_slug(language)));
		data.insert("url".to_string(), json!(self.detail_url(page)?));
		data.insert("path".to_string(), json!(page.get_path(language)));
		data.insert(
			"absolute_url".to_string(),
			json!(page.get_absolute_url(language)),
		);
		data.insert("redirect".to_string(), json!(page.get_redirect(language)));

		Ok(Value::Object(data))
	}

	/// Serialize a list of pages
	pub fn serialize_many(&self, pages: &[Page]) -> CmsResult<Vec<Value>> {
		pages.iter().map(|page| self.serialize(page)).collect()
	}

	fn detail_url(&self, page: &Page) -> CmsResult<String> {
		let params = HashMap::from([("pk".to_string(), page.id.to_string())]);
		self.reverser
			.reverse(&self.detail_view, &params)
			.map_err(|e| {
				CmsError::Upstream(format!("cannot reverse '{}': {}", self.detail_view, e))
			})
	}
}

/// Placeholder serializer bound to a request language
///
/// The owning page is embedded as `{"id": ..}` only, which keeps page and
/// placeholder output free of cycles.
#[derive(Debug, Clone)]
pub struct PlaceholderSerializer {
	language: String,
}

impl PlaceholderSerializer {
	/// Create a serializer for `language`
	pub fn new(language: impl Into<String>) -> Self {
		Self {
			language: language.into(),
		}
	}

	/// Serialize one placeholder
	pub fn serialize(&self, placeholder: &Placeholder) -> Value {
		let plugins: Vec<_> = placeholder.get_plugins(&self.language).collect();
		json!({
			"id": placeholder.id,
			"slot": placeholder.slot,
			"plugins": plugins,
			"page": placeholder.page.map(|id| json!({ "id": id })),
		})
	}

	/// Serialize a list of placeholders
	pub fn serialize_many(&self, placeholders: &[Placeholder]) -> Vec<Value> {
		placeholders.iter().map(|p| self.serialize(p)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::{PageTitle, PluginRef};
	use crate::source::PatternReverser;

	fn reverser() -> Arc<dyn UrlReverser> {
		Arc::new(PatternReverser::new().route("api:page-detail", "/api/pages/{pk}/"))
	}

	fn page() -> Page {
		let mut page = Page::new(4, 1)
			.with_title(
				"en",
				PageTitle::new("Team", "team")
					.with_path("about/team")
					.with_redirect("/en/people/"),
			)
			.with_title("de", PageTitle::new("Mannschaft", "mannschaft"));
		page.parent = Some(2);
		page.placeholders = vec![10, 11];
		page
	}

	#[test]
	fn test_field_order() {
		let data = PageSerializer::new("en", reverser(), "api:page-detail")
			.serialize(&page())
			.unwrap();

		let keys: Vec<_> = data.as_object().unwrap().keys().map(String::as_str).collect();
		assert_eq!(
			keys,
			vec![
				"id",
				"title",
				"placeholders",
				"creation_date",
				"changed_date",
				"publication_date",
				"publication_end_date",
				"in_navigation",
				"template",
				"is_home",
				"languages",
				"parent",
				"site",
				"page_title",
				"menu_title",
				"meta_description",
				"slug",
				"url",
				"path",
				"absolute_url",
				"redirect",
			]
		);
	}

	#[test]
	fn test_inherited_template_is_emitted_as_stored() {
		let mut child = page();
		let inherited = PageSerializer::new("en", reverser(), "api:page-detail")
			.serialize(&child)
			.unwrap();
		child.template = "fullwidth.html".to_string();
		let explicit = PageSerializer::new("en", reverser(), "api:page-detail")
			.serialize(&child)
			.unwrap();

		assert_eq!(inherited["template"], "INHERIT");
		assert_eq!(explicit["template"], "fullwidth.html");
	}

	#[test]
	fn test_localized_fields_use_bound_language() {
		let data = PageSerializer::new("de", reverser(), "api:page-detail")
			.serialize(&page())
			.unwrap();

		assert_eq!(data["title"], "Mannschaft");
		assert_eq!(data["slug"], "mannschaft");
		assert_eq!(data["path"], "mannschaft");
		assert_eq!(data["absolute_url"], "/de/mannschaft/");
		assert_eq!(data["redirect"], Value::Null);
		assert_eq!(data["url"], "/api/pages/4/");
		assert_eq!(data["parent"], 2);
		assert_eq!(data["placeholders"], json!([10, 11]));
	}

	#[test]
	fn test_unreversible_detail_view_is_upstream_error() {
		let err = PageSerializer::new("en", reverser(), "api:missing")
			.serialize(&page())
			.unwrap_err();
		assert!(matches!(err, CmsError::Upstream(_)));
	}

	#[test]
	fn test_placeholder_serialization() {
		let mut placeholder = Placeholder::new(10, "content", Some(4));
		placeholder.plugins = vec![
			PluginRef {
				id: 1,
				language: "en".to_string(),
			},
			PluginRef {
				id: 2,
				language: "de".to_string(),
			},
		];

		let data = PlaceholderSerializer::new("de").serialize(&placeholder);

		assert_eq!(
			data,
			json!({"id": 10, "slot": "content", "plugins": [2], "page": {"id": 4}})
		);
	}

	#[test]
	fn test_static_placeholder_has_null_page() {
		let placeholder = Placeholder::new(3, "footer", None);
		let data = PlaceholderSerializer::new("en").serialize(&placeholder);

		assert_eq!(data["page"], Value::Null);
		assert_eq!(data["plugins"], json!([]));
	}
}
