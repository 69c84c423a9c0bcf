//! In-memory CMS backend
//!
//! Implements every storage collaborator over process memory. Useful for
//! tests, fixtures and embedding the serializers without a database.

use crate::entity::Entity;
use crate::error::CmsResult;
use crate::models::{
	Actor, BoundPlugin, Page, PageId, Placeholder, PlaceholderId, PluginId, PluginRef, PluginRow,
};
use crate::source::{PagePermissions, PageStore, PluginSource, PublishedPages};
use crate::visibility::PageQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct State {
	pages: Vec<Page>,
	placeholders: BTreeMap<PlaceholderId, Placeholder>,
	plugins: BTreeMap<PluginId, PluginRow>,
	instances: HashMap<PluginId, Arc<dyn Entity>>,
	denied: HashSet<PageId>,
	now: Option<DateTime<Utc>>,
}

impl State {
	fn placeholder(&self, placeholder: &Placeholder) -> Placeholder {
		let mut rows: Vec<_> = self
			.plugins
			.values()
			.filter(|row| row.placeholder_id == placeholder.id)
			.collect();
		rows.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));

		let mut placeholder = placeholder.clone();
		placeholder.plugins = rows
			.into_iter()
			.map(|row| PluginRef {
				id: row.id,
				language: row.language.clone(),
			})
			.collect();
		placeholder
	}

	fn now(&self) -> DateTime<Utc> {
		self.now.unwrap_or_else(Utc::now)
	}
}

/// Thread-safe in-memory implementation of the storage collaborators
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::memory::InMemoryCms;
/// use reinhardt_cms_rest::models::{Page, PageTitle, Placeholder, PluginRow};
///
/// let cms = InMemoryCms::new();
/// cms.add_page(Page::new(1, 1).with_title("en", PageTitle::new("Home", "home")));
/// cms.add_placeholder(Placeholder::new(10, "content", Some(1)));
/// cms.add_plugin(PluginRow::new(100, 10, "TextPlugin", "en").with_path("0001"), None);
///
/// assert_eq!(cms.plugin_row(100).unwrap().placeholder_id, 10);
/// ```
#[derive(Default)]
pub struct InMemoryCms {
	state: RwLock<State>,
}

impl InMemoryCms {
	/// Create an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a page, replacing any page with the same id
	pub fn add_page(&self, page: Page) {
		let mut state = self.state.write();
		match state.pages.iter_mut().find(|p| p.id == page.id) {
			Some(existing) => *existing = page,
			None => state.pages.push(page),
		}
	}

	/// Insert a placeholder and attach it to its page
	pub fn add_placeholder(&self, placeholder: Placeholder) {
		let mut state = self.state.write();
		if let Some(page_id) = placeholder.page {
			let owner = state.pages.iter_mut().find(|p| p.id == page_id);
			if let Some(page) = owner.filter(|p| !p.placeholders.contains(&placeholder.id)) {
				page.placeholders.push(placeholder.id);
			}
		}
		state.placeholders.insert(placeholder.id, placeholder);
	}

	/// Insert a plugin row with its concrete instance
	pub fn add_plugin(&self, row: PluginRow, instance: Option<Arc<dyn Entity>>) {
		let mut state = self.state.write();
		match instance {
			Some(instance) => state.instances.insert(row.id, instance),
			None => state.instances.remove(&row.id),
		};
		state.plugins.insert(row.id, row);
	}

	/// Stored row of a plugin
	pub fn plugin_row(&self, id: PluginId) -> Option<PluginRow> {
		self.state.read().plugins.get(&id).cloned()
	}

	/// Stored page, with placeholders attached so far
	pub fn page(&self, id: PageId) -> Option<Page> {
		self.state.read().pages.iter().find(|p| p.id == id).cloned()
	}

	/// Deny view permission on a page for every actor
	pub fn deny(&self, page_id: PageId) {
		self.state.write().denied.insert(page_id);
	}

	/// Pin the clock used for publication windows, `None` for wall time
	pub fn set_now(&self, now: Option<DateTime<Utc>>) {
		self.state.write().now = now;
	}

	/// Builder form of [`InMemoryCms::set_now`]
	pub fn with_clock(self, now: DateTime<Utc>) -> Self {
		self.set_now(Some(now));
		self
	}
}

#[async_trait]
impl PageStore for InMemoryCms {
	async fn filter_pages(&self, query: &PageQuery) -> CmsResult<Vec<Page>> {
		let pages = self.state.read().pages.clone();
		Ok(query.apply(pages))
	}

	async fn get_page(&self, id: PageId) -> CmsResult<Option<Page>> {
		Ok(self.page(id))
	}

	async fn placeholders_for(&self, page_id: PageId) -> CmsResult<Vec<Placeholder>> {
		let state = self.state.read();
		Ok(state
			.placeholders
			.values()
			.filter(|p| p.page == Some(page_id))
			.map(|p| state.placeholder(p))
			.collect())
	}

	async fn get_placeholder(&self, id: PlaceholderId) -> CmsResult<Option<Placeholder>> {
		let state = self.state.read();
		Ok(state.placeholders.get(&id).map(|p| state.placeholder(p)))
	}
}

#[async_trait]
impl PluginSource for InMemoryCms {
	async fn get_plugin(&self, id: PluginId) -> CmsResult<Option<PluginRow>> {
		Ok(self.plugin_row(id))
	}

	async fn descendants(&self, root: &PluginRow) -> CmsResult<Vec<PluginRow>> {
		let state = self.state.read();
		let mut rows: Vec<PluginRow> = if root.path.is_empty() {
			// No materialized path, follow parent links instead
			let mut found = HashSet::from([root.id]);
			let mut rows = Vec::new();
			loop {
				let next: Vec<_> = state
					.plugins
					.values()
					.filter(|row| !found.contains(&row.id))
					.filter(|row| row.parent_id.is_some_and(|p| found.contains(&p)))
					.cloned()
					.collect();
				if next.is_empty() {
					break;
				}
				found.extend(next.iter().map(|row| row.id));
				rows.extend(next);
			}
			rows
		} else {
			state
				.plugins
				.values()
				.filter(|row| row.placeholder_id == root.placeholder_id)
				.filter(|row| row.id != root.id)
				.filter(|row| row.path.len() > root.path.len() && row.path.starts_with(&root.path))
				.cloned()
				.collect()
		};

		rows.sort_by(|a, b| {
			(a.placeholder_id, &a.path, a.position, a.id).cmp(&(
				b.placeholder_id,
				&b.path,
				b.position,
				b.id,
			))
		});
		Ok(rows)
	}

	async fn downcast(&self, rows: Vec<PluginRow>) -> CmsResult<Vec<BoundPlugin>> {
		let state = self.state.read();
		Ok(rows
			.into_iter()
			.map(|row| {
				let instance = state.instances.get(&row.id).cloned();
				BoundPlugin::new(row, instance)
			})
			.collect())
	}
}

#[async_trait]
impl PagePermissions for InMemoryCms {
	async fn can_view(&self, _actor: &Actor, page: &Page) -> CmsResult<bool> {
		Ok(!self.state.read().denied.contains(&page.id))
	}
}

#[async_trait]
impl PublishedPages for InMemoryCms {
	async fn is_published(&self, page_id: PageId) -> CmsResult<bool> {
		let state = self.state.read();
		let now = state.now();
		Ok(state.pages.iter().any(|page| {
			page.id == page_id
				&& !page.publisher_is_draft
				&& page.publication_date.is_none_or(|start| start <= now)
				&& page.publication_end_date.is_none_or(|end| end > now)
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::visibility::scope;
	use chrono::{Duration, TimeZone};
	use rstest::{fixture, rstest};

	#[fixture]
	fn cms() -> InMemoryCms {
		let cms = InMemoryCms::new();
		cms.add_placeholder(Placeholder::new(1, "content", None));
		for row in [
			PluginRow::new(1, 1, "ColumnPlugin", "en").with_path("0001"),
			PluginRow::new(2, 1, "TextPlugin", "en").child_of(1, 1).with_path("00010002"),
			PluginRow::new(3, 1, "TextPlugin", "en").child_of(1, 0).with_path("00010001"),
			PluginRow::new(4, 1, "TextPlugin", "de").with_path("0002"),
			PluginRow::new(5, 2, "TextPlugin", "en").with_path("00010003"),
		] {
			cms.add_plugin(row, None);
		}
		cms
	}

	#[rstest]
	#[tokio::test]
	async fn test_descendants_by_path(cms: InMemoryCms) {
		let root = cms.plugin_row(1).unwrap();

		let ids: Vec<_> = cms
			.descendants(&root)
			.await
			.unwrap()
			.iter()
			.map(|row| row.id)
			.collect();

		assert_eq!(ids, vec![3, 2]);
	}

	#[tokio::test]
	async fn test_descendants_by_parent_links() {
		let cms = InMemoryCms::new();
		cms.add_plugin(PluginRow::new(1, 1, "ColumnPlugin", "en"), None);
		cms.add_plugin(PluginRow::new(2, 1, "ColumnPlugin", "en").child_of(1, 0), None);
		cms.add_plugin(PluginRow::new(3, 1, "TextPlugin", "en").child_of(2, 0), None);
		cms.add_plugin(PluginRow::new(4, 1, "TextPlugin", "en"), None);

		let root = cms.plugin_row(1).unwrap();
		let mut ids: Vec<_> = cms
			.descendants(&root)
			.await
			.unwrap()
			.iter()
			.map(|row| row.id)
			.collect();
		ids.sort();

		assert_eq!(ids, vec![2, 3]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_placeholder_plugins_in_path_order(cms: InMemoryCms) {
		let placeholder = cms.get_placeholder(1).await.unwrap().unwrap();

		let en: Vec<_> = placeholder.get_plugins("en").collect();
		let de: Vec<_> = placeholder.get_plugins("de").collect();
		assert_eq!(en, vec![1, 3, 2]);
		assert_eq!(de, vec![4]);
	}

	#[tokio::test]
	async fn test_placeholder_attaches_to_page() {
		let cms = InMemoryCms::new();
		cms.add_page(Page::new(1, 1));
		cms.add_placeholder(Placeholder::new(7, "content", Some(1)));
		cms.add_placeholder(Placeholder::new(7, "content", Some(1)));

		assert_eq!(cms.page(1).unwrap().placeholders, vec![7]);
		assert_eq!(cms.placeholders_for(1).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_filter_pages_uses_query() {
		let cms = InMemoryCms::new();
		cms.add_page(Page::new(1, 1));
		cms.add_page(Page::new(2, 2));

		let pages = cms.filter_pages(&scope(&Actor::anonymous(), 2)).await.unwrap();

		assert_eq!(pages.len(), 1);
		assert_eq!(pages[0].id, 2);
	}

	#[rstest]
	#[case(None, None, true)]
	#[case(Some(-1), None, true)]
	#[case(Some(1), None, false)]
	#[case(Some(-2), Some(-1), false)]
	#[case(Some(-2), Some(1), true)]
	#[case(None, Some(0), false)]
	#[tokio::test]
	async fn test_publication_window(
		#[case] start: Option<i64>,
		#[case] end: Option<i64>,
		#[case] expected: bool,
	) {
		let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
		let cms = InMemoryCms::new().with_clock(now);
		let mut page = Page::new(1, 1);
		page.publication_date = start.map(|d| now + Duration::days(d));
		page.publication_end_date = end.map(|d| now + Duration::days(d));
		cms.add_page(page);

		assert_eq!(cms.is_published(1).await.unwrap(), expected);
	}

	#[tokio::test]
	async fn test_downcast_preserves_order_and_attaches_instances() {
		let cms = InMemoryCms::new();
		cms.add_plugin(PluginRow::new(1, 1, "SpacerPlugin", "en"), None);
		cms.add_plugin(PluginRow::new(2, 1, "SpacerPlugin", "en"), None);

		let rows = vec![cms.plugin_row(2).unwrap(), cms.plugin_row(1).unwrap()];
		let bound = cms.downcast(rows).await.unwrap();

		assert_eq!(bound.iter().map(BoundPlugin::id).collect::<Vec<_>>(), vec![2, 1]);
		assert!(bound.iter().all(|plugin| plugin.instance.is_none()));
	}
}
