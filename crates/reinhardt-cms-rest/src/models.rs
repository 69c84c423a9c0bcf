//! Page, placeholder and plugin rows
//!
//! These are read-only snapshots of what the host CMS stores. Nothing in this
//! crate mutates them.

use crate::entity::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Page primary key
pub type PageId = i64;
/// Placeholder primary key
pub type PlaceholderId = i64;
/// Plugin primary key
pub type PluginId = i64;
/// Site primary key
pub type SiteId = i64;
/// User primary key
pub type UserId = i64;

/// Per-language page content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTitle {
	/// Title shown in page headings
	pub title: String,
	/// HTML `<title>` override
	pub page_title: Option<String>,
	/// Menu label override
	pub menu_title: Option<String>,
	/// Meta description
	pub meta_description: Option<String>,
	/// URL slug
	pub slug: String,
	/// Full path below the language prefix
	pub path: String,
	/// Redirect target, if any
	pub redirect: Option<String>,
}

impl PageTitle {
	/// Create a title with slug and path derived from each other
	pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
		let slug = slug.into();
		Self {
			title: title.into(),
			path: slug.clone(),
			slug,
			..Default::default()
		}
	}

	/// Override the path
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// Set a redirect target
	pub fn with_redirect(mut self, redirect: impl Into<String>) -> Self {
		self.redirect = Some(redirect.into());
		self
	}
}

/// A localized content container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
	/// Primary key
	pub id: PageId,
	/// Localized content keyed by language code
	pub titles: HashMap<String, PageTitle>,
	/// Template identifier as stored. `"INHERIT"` means the template of the
	/// nearest ancestor applies; serializers emit it unresolved.
	pub template: String,
	/// Shown in navigation menus
	pub in_navigation: bool,
	/// Site root page
	pub is_home: bool,
	/// Creation timestamp
	pub creation_date: DateTime<Utc>,
	/// Last change timestamp
	pub changed_date: DateTime<Utc>,
	/// Start of the publication window
	pub publication_date: Option<DateTime<Utc>>,
	/// End of the publication window
	pub publication_end_date: Option<DateTime<Utc>>,
	/// Parent page
	pub parent: Option<PageId>,
	/// Owning site
	pub site: SiteId,
	/// Available languages in preference order
	pub languages: Vec<String>,
	/// Placeholders attached to the page
	pub placeholders: Vec<PlaceholderId>,
	/// Draft copy rather than the public version
	pub publisher_is_draft: bool,
	/// Only authenticated users may view the page
	pub login_required: bool,
}

impl Page {
	/// Create a public, undated page on `site`
	pub fn new(id: PageId, site: SiteId) -> Self {
		let now = Utc::now();
		Self {
			id,
			titles: HashMap::new(),
			template: "INHERIT".to_string(),
			in_navigation: true,
			is_home: false,
			creation_date: now,
			changed_date: now,
			publication_date: None,
			publication_end_date: None,
			parent: None,
			site,
			languages: Vec::new(),
			placeholders: Vec::new(),
			publisher_is_draft: false,
			login_required: false,
		}
	}

	/// Add localized content, registering the language if it is new
	pub fn with_title(mut self, language: impl Into<String>, title: PageTitle) -> Self {
		let language = language.into();
		if !self.languages.contains(&language) {
			self.languages.push(language.clone());
		}
		self.titles.insert(language, title);
		self
	}

	/// Title record for `language`, falling back to the first page language
	/// that has one
	pub fn title_for(&self, language: &str) -> Option<&PageTitle> {
		self.titles.get(language).or_else(|| {
			self.languages
				.iter()
				.find_map(|fallback| self.titles.get(fallback))
		})
	}

	/// Localized title
	pub fn get_title(&self, language: &str) -> Option<&str> {
		self.title_for(language).map(|t| t.title.as_str())
	}

	/// Localized page title, defaulting to the title
	pub fn get_page_title(&self, language: &str) -> Option<&str> {
		self.title_for(language)
			.map(|t| t.page_title.as_deref().unwrap_or(t.title.as_str()))
	}

	/// Localized menu title, defaulting to the title
	pub fn get_menu_title(&self, language: &str) -> Option<&str> {
		self.title_for(language)
			.map(|t| t.menu_title.as_deref().unwrap_or(t.title.as_str()))
	}

	/// Localized meta description
	pub fn get_meta_description(&self, language: &str) -> Option<&str> {
		self.title_for(language)
			.and_then(|t| t.meta_description.as_deref())
	}

	/// Localized slug
	pub fn get_slug(&self, language: &str) -> Option<&str> {
		self.title_for(language).map(|t| t.slug.as_str())
	}

	/// Localized path
	pub fn get_path(&self, language: &str) -> Option<&str> {
		self.title_for(language).map(|t| t.path.as_str())
	}

	/// Localized redirect target
	pub fn get_redirect(&self, language: &str) -> Option<&str> {
		self.title_for(language).and_then(|t| t.redirect.as_deref())
	}

	/// Public URL of the page for `language`
	///
	/// The home page lives at the language root.
	pub fn get_absolute_url(&self, language: &str) -> String {
		match self.get_path(language) {
			Some(path) if !self.is_home && !path.is_empty() => {
				format!("/{}/{}/", language, path.trim_matches('/'))
			}
			_ => format!("/{}/", language),
		}
	}
}

/// Plugin reference stored on a placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
	/// Plugin primary key
	pub id: PluginId,
	/// Plugin language
	pub language: String,
}

/// A named slot belonging to a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
	/// Primary key
	pub id: PlaceholderId,
	/// Slot name
	pub slot: String,
	/// Owning page, `None` for static placeholders
	pub page: Option<PageId>,
	/// Plugins in storage order
	pub plugins: Vec<PluginRef>,
}

impl Placeholder {
	/// Create an empty placeholder
	pub fn new(id: PlaceholderId, slot: impl Into<String>, page: Option<PageId>) -> Self {
		Self {
			id,
			slot: slot.into(),
			page,
			plugins: Vec::new(),
		}
	}

	/// Plugin ids for `language`, in storage order
	pub fn get_plugins<'a>(&'a self, language: &'a str) -> impl Iterator<Item = PluginId> + 'a {
		self.plugins
			.iter()
			.filter(move |plugin| plugin.language == language)
			.map(|plugin| plugin.id)
	}
}

/// Generic plugin tree node (`CMSPlugin`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRow {
	/// Primary key
	pub id: PluginId,
	/// Owning placeholder
	#[serde(rename = "placeholder")]
	pub placeholder_id: PlaceholderId,
	/// Parent node, `None` at the placeholder level
	#[serde(rename = "parent")]
	pub parent_id: Option<PluginId>,
	/// Sibling order key
	pub position: i32,
	/// Content language
	pub language: String,
	/// Plugin type tag
	pub plugin_type: String,
	/// Creation timestamp
	pub creation_date: DateTime<Utc>,
	/// Last change timestamp
	pub changed_date: DateTime<Utc>,
	/// Materialized tree path used for ordering
	#[serde(skip_serializing, default)]
	pub path: String,
}

impl PluginRow {
	/// Create a root-level row
	pub fn new(
		id: PluginId,
		placeholder_id: PlaceholderId,
		plugin_type: impl Into<String>,
		language: impl Into<String>,
	) -> Self {
		let now = Utc::now();
		Self {
			id,
			placeholder_id,
			parent_id: None,
			position: 0,
			language: language.into(),
			plugin_type: plugin_type.into(),
			creation_date: now,
			changed_date: now,
			path: String::new(),
		}
	}

	/// Set the parent and position
	pub fn child_of(mut self, parent_id: PluginId, position: i32) -> Self {
		self.parent_id = Some(parent_id);
		self.position = position;
		self
	}

	/// Set the tree path
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	/// Set the position
	pub fn with_position(mut self, position: i32) -> Self {
		self.position = position;
		self
	}
}

/// A plugin row together with its downcast concrete instance
#[derive(Debug, Clone)]
pub struct BoundPlugin {
	/// Generic row
	pub row: PluginRow,
	/// Concrete instance, absent for model-less plugin types
	pub instance: Option<Arc<dyn Entity>>,
}

impl BoundPlugin {
	/// Bind a row to its concrete instance
	pub fn new(row: PluginRow, instance: Option<Arc<dyn Entity>>) -> Self {
		Self { row, instance }
	}

	/// Primary key of the row
	pub fn id(&self) -> PluginId {
		self.row.id
	}
}

/// The user a request acts on behalf of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
	/// Authenticated user, `None` for anonymous requests
	pub user_id: Option<UserId>,
	/// Staff members see draft content
	pub is_staff: bool,
}

impl Actor {
	/// Anonymous visitor
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// Authenticated non-staff user
	pub fn user(user_id: UserId) -> Self {
		Self {
			user_id: Some(user_id),
			is_staff: false,
		}
	}

	/// Authenticated staff user
	pub fn staff(user_id: UserId) -> Self {
		Self {
			user_id: Some(user_id),
			is_staff: true,
		}
	}

	/// Whether the actor is logged in
	pub fn is_authenticated(&self) -> bool {
		self.user_id.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn sample_page() -> Page {
		Page::new(1, 1)
			.with_title(
				"en",
				PageTitle::new("About", "about").with_path("company/about"),
			)
			.with_title("de", PageTitle::new("Über uns", "ueber-uns"))
	}

	#[rstest]
	#[case("en", "About")]
	#[case("de", "Über uns")]
	#[case("fr", "About")]
	fn test_title_falls_back_to_first_language(#[case] language: &str, #[case] expected: &str) {
		let page = sample_page();
		assert_eq!(page.get_title(language), Some(expected));
	}

	#[test]
	fn test_page_and_menu_title_default_to_title() {
		let page = sample_page();
		assert_eq!(page.get_page_title("en"), Some("About"));
		assert_eq!(page.get_menu_title("de"), Some("Über uns"));
		assert_eq!(page.get_meta_description("en"), None);
	}

	#[test]
	fn test_absolute_url() {
		let mut page = sample_page();
		assert_eq!(page.get_absolute_url("en"), "/en/company/about/");

		page.is_home = true;
		assert_eq!(page.get_absolute_url("en"), "/en/");
	}

	#[test]
	fn test_untitled_page_has_no_localized_fields() {
		let page = Page::new(7, 1);
		assert_eq!(page.get_title("en"), None);
		assert_eq!(page.get_absolute_url("en"), "/en/");
	}

	#[test]
	fn test_placeholder_plugins_filtered_by_language_in_storage_order() {
		let mut placeholder = Placeholder::new(1, "content", Some(1));
		for (id, language) in [(5, "en"), (2, "de"), (9, "en"), (1, "en")] {
			placeholder.plugins.push(PluginRef {
				id,
				language: language.to_string(),
			});
		}

		let ids: Vec<_> = placeholder.get_plugins("en").collect();
		assert_eq!(ids, vec![5, 9, 1]);
	}

	#[test]
	fn test_actor_flags() {
		assert!(!Actor::anonymous().is_authenticated());
		assert!(Actor::user(1).is_authenticated());
		assert!(Actor::staff(1).is_staff);
	}
}
