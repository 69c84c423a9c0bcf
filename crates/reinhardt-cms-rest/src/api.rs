//! List and retrieve operations for the view layer
//!
//! [`CmsApi`] wires the scoping policy, the visibility check and the
//! serializers together. Anything missing, out of scope or invisible comes
//! back as [`CmsError::NotFound`] so the view layer can answer with a 404
//! without leaking whether the object exists.

use crate::error::{CmsError, CmsResult};
use crate::memory::InMemoryCms;
use crate::models::{Actor, Page, PageId, PlaceholderId, PluginId};
use crate::plugins::PluginPool;
use crate::serializers::{
	ModelSerializerFactory, PageSerializer, PlaceholderSerializer, PluginTreeSerializer,
	SerializerRegistry,
};
use crate::settings::CmsRestSettings;
use crate::source::{
	FixedSite, PagePermissions, PageStore, PatternReverser, PluginSource, PublishedPages,
	SiteResolver, UrlReverser,
};
use crate::visibility::{VisibilityPolicy, scope};
use serde_json::Value;
use std::sync::Arc;

/// Per-request inputs
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
	/// Who is asking
	pub actor: Actor,
	/// Requested language, if any
	pub language: Option<String>,
	/// Request host, used for site resolution
	pub host: String,
}

impl RequestContext {
	/// Create a request for `actor` without language or host
	pub fn new(actor: Actor) -> Self {
		Self {
			actor,
			..Default::default()
		}
	}

	/// Set the requested language
	pub fn with_language(mut self, language: impl Into<String>) -> Self {
		self.language = Some(language.into());
		self
	}

	/// Set the request host
	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();
		self
	}
}

/// Collaborators the API delegates to
#[derive(Clone)]
pub struct Collaborators {
	/// Page and placeholder storage
	pub pages: Arc<dyn PageStore>,
	/// Plugin storage
	pub plugins: Arc<dyn PluginSource>,
	/// Page permission checks
	pub permissions: Arc<dyn PagePermissions>,
	/// Published-set membership
	pub published: Arc<dyn PublishedPages>,
	/// Router used for detail URLs
	pub reverser: Arc<dyn UrlReverser>,
	/// Current site resolution
	pub sites: Arc<dyn SiteResolver>,
	/// Registered plugin types
	pub pool: Arc<PluginPool>,
	/// Plugin serializer resolution
	pub registry: Arc<SerializerRegistry>,
}

impl Collaborators {
	/// Collaborators backed entirely by an [`InMemoryCms`]
	///
	/// Detail URLs follow `/api/pages/{pk}/`, the site is fixed to
	/// `settings.site_id` and the serializer cache uses the configured
	/// keying.
	pub fn in_memory(cms: Arc<InMemoryCms>, pool: PluginPool, settings: &CmsRestSettings) -> Self {
		let factory = Arc::new(ModelSerializerFactory::new(settings.serializer_cache));
		Self {
			pages: cms.clone(),
			plugins: cms.clone(),
			permissions: cms.clone(),
			published: cms,
			reverser: Arc::new(
				PatternReverser::new().route(settings.page_detail_view.clone(), "/api/pages/{pk}/"),
			),
			sites: Arc::new(FixedSite(settings.site_id)),
			pool: Arc::new(pool),
			registry: Arc::new(SerializerRegistry::new(factory)),
		}
	}

	/// Replace the serializer registry
	pub fn with_registry(mut self, registry: SerializerRegistry) -> Self {
		self.registry = Arc::new(registry);
		self
	}

	/// Replace the site resolver
	pub fn with_sites(mut self, sites: impl SiteResolver + 'static) -> Self {
		self.sites = Arc::new(sites);
		self
	}
}

/// Read-only CMS API
pub struct CmsApi {
	settings: CmsRestSettings,
	collaborators: Collaborators,
	visibility: VisibilityPolicy,
}

impl CmsApi {
	/// Create the API after validating `settings`
	pub fn new(settings: CmsRestSettings, collaborators: Collaborators) -> CmsResult<Self> {
		settings.validate()?;
		let visibility = VisibilityPolicy::new(
			collaborators.permissions.clone(),
			collaborators.published.clone(),
		);
		Ok(Self {
			settings,
			collaborators,
			visibility,
		})
	}

	/// Active settings
	pub fn settings(&self) -> &CmsRestSettings {
		&self.settings
	}

	/// Language every localized field of this request is resolved with
	pub fn resolve_language<'a>(&'a self, request: &'a RequestContext) -> &'a str {
		self.settings.resolve_language(request.language.as_deref())
	}

	/// Pages in the request's scope
	pub async fn list_pages(&self, request: &RequestContext) -> CmsResult<Vec<Value>> {
		let site = self.collaborators.sites.current_site(request)?;
		let query = scope(&request.actor, site);
		let pages = self.collaborators.pages.filter_pages(&query).await?;
		tracing::debug!(site, count = pages.len(), "listing pages");

		self.page_serializer(request).serialize_many(&pages)
	}

	/// A single visible page
	pub async fn retrieve_page(&self, request: &RequestContext, id: PageId) -> CmsResult<Value> {
		let page = self.visible_page(request, id).await?;
		self.page_serializer(request).serialize(&page)
	}

	/// Placeholders of a visible page
	pub async fn page_placeholders(
		&self,
		request: &RequestContext,
		page_id: PageId,
	) -> CmsResult<Vec<Value>> {
		let page = self.visible_page(request, page_id).await?;
		let placeholders = self.collaborators.pages.placeholders_for(page.id).await?;
		Ok(self.placeholder_serializer(request).serialize_many(&placeholders))
	}

	/// A single placeholder of a visible page
	pub async fn retrieve_placeholder(
		&self,
		request: &RequestContext,
		id: PlaceholderId,
	) -> CmsResult<Value> {
		let placeholder = self
			.collaborators
			.pages
			.get_placeholder(id)
			.await?
			.ok_or_else(|| not_found("placeholder", id))?;
		self.owning_page(request, placeholder.page, "placeholder", id)
			.await?;

		Ok(self.placeholder_serializer(request).serialize(&placeholder))
	}

	/// A plugin with its subtree, if its page is visible
	pub async fn retrieve_plugin(&self, request: &RequestContext, id: PluginId) -> CmsResult<Value> {
		let row = self
			.collaborators
			.plugins
			.get_plugin(id)
			.await?
			.ok_or_else(|| not_found("plugin", id))?;
		let placeholder = self
			.collaborators
			.pages
			.get_placeholder(row.placeholder_id)
			.await?
			.ok_or_else(|| not_found("plugin", id))?;
		self.owning_page(request, placeholder.page, "plugin", id)
			.await?;

		PluginTreeSerializer::new(
			self.collaborators.plugins.as_ref(),
			&self.collaborators.pool,
			&self.collaborators.registry,
		)
		.serialize(&row)
		.await
	}

	async fn owning_page(
		&self,
		request: &RequestContext,
		page: Option<PageId>,
		kind: &str,
		id: i64,
	) -> CmsResult<Page> {
		match page {
			Some(page_id) => self
				.visible_page(request, page_id)
				.await
				.map_err(|e| if e.is_not_found() { not_found(kind, id) } else { e }),
			None => {
				tracing::debug!(kind, id, "object is not attached to a page");
				Err(not_found(kind, id))
			}
		}
	}

	async fn visible_page(&self, request: &RequestContext, id: PageId) -> CmsResult<Page> {
		let page = self
			.collaborators
			.pages
			.get_page(id)
			.await?
			.ok_or_else(|| not_found("page", id))?;

		let site = self.collaborators.sites.current_site(request)?;
		if !scope(&request.actor, site).matches(&page) {
			tracing::debug!(page_id = id, site, "page outside request scope");
			return Err(not_found("page", id));
		}
		if !self.visibility.is_visible(&request.actor, &page).await? {
			tracing::debug!(page_id = id, "page not visible to actor");
			return Err(not_found("page", id));
		}
		Ok(page)
	}

	fn page_serializer(&self, request: &RequestContext) -> PageSerializer {
		PageSerializer::new(
			self.resolve_language(request),
			self.collaborators.reverser.clone(),
			self.settings.page_detail_view.as_str(),
		)
	}

	fn placeholder_serializer(&self, request: &RequestContext) -> PlaceholderSerializer {
		PlaceholderSerializer::new(self.resolve_language(request))
	}
}

fn not_found(kind: &str, id: i64) -> CmsError {
	CmsError::NotFound(format!("{} {} not found", kind, id))
}
