//! Page scoping and visibility
//!
//! Listing and retrieval share one scope ([`scope`]); retrieval additionally
//! runs the per-page check in [`VisibilityPolicy::is_visible`].

use crate::error::CmsResult;
use crate::models::{Actor, Page, SiteId};
use crate::source::{PagePermissions, PublishedPages};
use std::collections::HashSet;
use std::sync::Arc;

/// Which publisher copies a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherScope {
	/// Public copies only
	Published,
	/// Drafts and public copies
	DraftsAndPublished,
}

/// Page filter handed to [`PageStore::filter_pages`](crate::source::PageStore::filter_pages)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
	/// Site the pages must belong to
	pub site: SiteId,
	/// Publisher copies included
	pub scope: PublisherScope,
	/// Deduplicate by primary key
	pub distinct: bool,
}

impl PageQuery {
	/// Whether a single page falls inside the query
	pub fn matches(&self, page: &Page) -> bool {
		if page.site != self.site {
			return false;
		}
		match self.scope {
			PublisherScope::Published => !page.publisher_is_draft,
			PublisherScope::DraftsAndPublished => true,
		}
	}

	/// Filter `pages`, keeping the first occurrence of each id
	pub fn apply(&self, pages: impl IntoIterator<Item = Page>) -> Vec<Page> {
		let mut seen = HashSet::new();
		pages
			.into_iter()
			.filter(|page| self.matches(page))
			.filter(|page| !self.distinct || seen.insert(page.id))
			.collect()
	}
}

/// Base page query for `actor` on `site`
///
/// Staff see drafts as well as published pages; everyone else sees published
/// pages only. The query is always distinct.
pub fn scope(actor: &Actor, site: SiteId) -> PageQuery {
	let scope = if actor.is_staff {
		PublisherScope::DraftsAndPublished
	} else {
		PublisherScope::Published
	};
	PageQuery {
		site,
		scope,
		distinct: true,
	}
}

/// Per-page visibility check
#[derive(Clone)]
pub struct VisibilityPolicy {
	permissions: Arc<dyn PagePermissions>,
	published: Arc<dyn PublishedPages>,
}

impl VisibilityPolicy {
	/// Create a policy over the permission and published-set collaborators
	pub fn new(permissions: Arc<dyn PagePermissions>, published: Arc<dyn PublishedPages>) -> Self {
		Self {
			permissions,
			published,
		}
	}

	/// Whether `actor` may see `page`
	///
	/// Drafts are never visible here, whoever asks. Login-required pages are
	/// hidden from anonymous actors. The permission collaborator decides
	/// next, and the published set has the final word.
	pub async fn is_visible(&self, actor: &Actor, page: &Page) -> CmsResult<bool> {
		if page.publisher_is_draft {
			return Ok(false);
		}
		if page.login_required && !actor.is_authenticated() {
			return Ok(false);
		}
		if !self.permissions.can_view(actor, page).await? {
			return Ok(false);
		}
		self.published.is_published(page.id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::InMemoryCms;
	use chrono::{Duration, Utc};
	use rstest::rstest;

	fn draft(id: i64, site: SiteId) -> Page {
		let mut page = Page::new(id, site);
		page.publisher_is_draft = true;
		page
	}

	#[rstest]
	#[case(Actor::staff(1), vec![1, 2])]
	#[case(Actor::user(2), vec![1])]
	#[case(Actor::anonymous(), vec![1])]
	fn test_scope_by_actor(#[case] actor: Actor, #[case] expected: Vec<i64>) {
		let pages = vec![Page::new(1, 1), draft(2, 1), Page::new(3, 2)];

		let ids: Vec<_> = scope(&actor, 1).apply(pages).iter().map(|p| p.id).collect();

		assert_eq!(ids, expected);
	}

	#[test]
	fn test_scope_is_distinct() {
		let pages = vec![Page::new(4, 1), Page::new(3, 1), Page::new(4, 1)];

		let query = scope(&Actor::anonymous(), 1);
		let ids: Vec<_> = query.apply(pages).iter().map(|p| p.id).collect();

		assert!(query.distinct);
		assert_eq!(ids, vec![4, 3]);
	}

	fn policy(cms: &Arc<InMemoryCms>) -> VisibilityPolicy {
		VisibilityPolicy::new(cms.clone(), cms.clone())
	}

	#[tokio::test]
	async fn test_draft_is_never_visible() {
		let cms = Arc::new(InMemoryCms::new());
		let page = draft(1, 1);
		cms.add_page(page.clone());

		assert!(!policy(&cms).is_visible(&Actor::staff(1), &page).await.unwrap());
	}

	#[rstest]
	#[case(Actor::anonymous(), false)]
	#[case(Actor::user(5), true)]
	#[tokio::test]
	async fn test_login_required(#[case] actor: Actor, #[case] expected: bool) {
		let cms = Arc::new(InMemoryCms::new());
		let mut page = Page::new(1, 1);
		page.login_required = true;
		cms.add_page(page.clone());

		assert_eq!(policy(&cms).is_visible(&actor, &page).await.unwrap(), expected);
	}

	#[tokio::test]
	async fn test_denied_permission_hides_page() {
		let cms = Arc::new(InMemoryCms::new());
		let page = Page::new(1, 1);
		cms.add_page(page.clone());
		cms.deny(1);

		assert!(!policy(&cms).is_visible(&Actor::user(1), &page).await.unwrap());
	}

	#[tokio::test]
	async fn test_published_set_has_final_word() {
		let cms = Arc::new(InMemoryCms::new());
		let mut page = Page::new(1, 1);
		page.publication_date = Some(Utc::now() + Duration::days(1));
		cms.add_page(page.clone());

		assert!(!policy(&cms).is_visible(&Actor::anonymous(), &page).await.unwrap());
	}
}
