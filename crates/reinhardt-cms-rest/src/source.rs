//! Storage, routing and site collaborators
//!
//! The host CMS owns persistence, permissions, routing and multi-tenancy.
//! This crate consumes them through the traits below.

use crate::api::RequestContext;
use crate::error::{CmsError, CmsResult};
use crate::models::{
	Actor, BoundPlugin, Page, PageId, Placeholder, PlaceholderId, PluginId, PluginRow, SiteId,
};
use crate::visibility::PageQuery;
use async_trait::async_trait;
use std::collections::HashMap;

/// Plugin tree storage
#[async_trait]
pub trait PluginSource: Send + Sync {
	/// Fetch one plugin row
	async fn get_plugin(&self, id: PluginId) -> CmsResult<Option<PluginRow>>;

	/// All descendants of `root`, ordered by (placeholder, tree path)
	///
	/// The root itself is not included.
	async fn descendants(&self, root: &PluginRow) -> CmsResult<Vec<PluginRow>>;

	/// Downcast every row to its concrete instance in one batch, preserving
	/// input order
	async fn downcast(&self, rows: Vec<PluginRow>) -> CmsResult<Vec<BoundPlugin>>;
}

/// Page and placeholder storage
#[async_trait]
pub trait PageStore: Send + Sync {
	/// Pages matching a query, deduplicated
	async fn filter_pages(&self, query: &PageQuery) -> CmsResult<Vec<Page>>;

	/// Fetch one page regardless of publication state
	async fn get_page(&self, id: PageId) -> CmsResult<Option<Page>>;

	/// Placeholders attached to a page
	async fn placeholders_for(&self, page_id: PageId) -> CmsResult<Vec<Placeholder>>;

	/// Fetch one placeholder
	async fn get_placeholder(&self, id: PlaceholderId) -> CmsResult<Option<Placeholder>>;
}

/// Page-level permission check, independent of publication windows
#[async_trait]
pub trait PagePermissions: Send + Sync {
	/// Whether `actor` may view `page`
	async fn can_view(&self, actor: &Actor, page: &Page) -> CmsResult<bool>;
}

/// Authoritative published-set membership
#[async_trait]
pub trait PublishedPages: Send + Sync {
	/// Whether the page is currently published, publication window included
	async fn is_published(&self, page_id: PageId) -> CmsResult<bool>;
}

/// Trait for URL reversal functionality
///
/// Abstracts the router so serializers can build detail URLs without
/// depending on it.
pub trait UrlReverser: Send + Sync {
	/// Reverse a URL name to a path with parameters
	///
	/// # Arguments
	///
	/// * `name` - The route name
	/// * `params` - Map of parameter names to values
	fn reverse(&self, name: &str, params: &HashMap<String, String>) -> Result<String, String>;
}

/// Reverser backed by a table of route patterns with `{param}` segments
///
/// # Examples
///
/// ```
/// use reinhardt_cms_rest::source::{PatternReverser, UrlReverser};
/// use std::collections::HashMap;
///
/// let reverser = PatternReverser::new().route("api:page-detail", "/api/pages/{pk}/");
/// let params = HashMap::from([("pk".to_string(), "7".to_string())]);
///
/// assert_eq!(reverser.reverse("api:page-detail", &params).unwrap(), "/api/pages/7/");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatternReverser {
	routes: HashMap<String, String>,
}

impl PatternReverser {
	/// Create an empty reverser
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a named route pattern
	pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
		self.routes.insert(name.into(), pattern.into());
		self
	}
}

impl UrlReverser for PatternReverser {
	fn reverse(&self, name: &str, params: &HashMap<String, String>) -> Result<String, String> {
		let pattern = self
			.routes
			.get(name)
			.ok_or_else(|| format!("no route named '{}'", name))?;

		let mut path = pattern.clone();
		for (key, value) in params {
			path = path.replace(&format!("{{{}}}", key), value);
		}

		if path.contains('{') {
			return Err(format!("missing parameters for route '{}': {}", name, path));
		}
		Ok(path)
	}
}

/// Resolves the current site of a request
pub trait SiteResolver: Send + Sync {
	/// Site the request is served for
	fn current_site(&self, request: &RequestContext) -> CmsResult<SiteId>;
}

/// Single-site deployments (Django's `SITE_ID`)
#[derive(Debug, Clone, Copy)]
pub struct FixedSite(pub SiteId);

impl SiteResolver for FixedSite {
	fn current_site(&self, _request: &RequestContext) -> CmsResult<SiteId> {
		Ok(self.0)
	}
}

/// Host-name based site resolution with an optional default
#[derive(Debug, Clone, Default)]
pub struct HostSites {
	hosts: HashMap<String, SiteId>,
	default: Option<SiteId>,
}

impl HostSites {
	/// Create an empty host table
	pub fn new() -> Self {
		Self::default()
	}

	/// Map a host name to a site
	pub fn host(mut self, host: impl Into<String>, site: SiteId) -> Self {
		self.hosts.insert(host.into().to_ascii_lowercase(), site);
		self
	}

	/// Site used for unknown hosts
	pub fn with_default(mut self, site: SiteId) -> Self {
		self.default = Some(site);
		self
	}
}

impl SiteResolver for HostSites {
	fn current_site(&self, request: &RequestContext) -> CmsResult<SiteId> {
		let host = strip_port(&request.host).to_ascii_lowercase();

		self.hosts
			.get(&host)
			.copied()
			.or(self.default)
			.ok_or_else(|| CmsError::NotFound(format!("no site for host '{}'", request.host)))
	}
}

/// Host without its port; bracketed IPv6 literals keep their brackets
fn strip_port(host: &str) -> &str {
	if host.starts_with('[') {
		return match host.find(']') {
			Some(end) => &host[..=end],
			None => host,
		};
	}
	match host.split_once(':') {
		// More than one colon is a bare IPv6 address, which carries no port
		Some((name, port)) if !port.contains(':') => name,
		_ => host,
	}
}
