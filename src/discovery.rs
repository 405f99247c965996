//! Provider discovery.
//!
//! Queries every registered provider for its tool descriptors and
//! normalizes them into catalog entries. Providers are queried
//! concurrently and failures are isolated: one provider's outage marks
//! that source offline and emits a [`RouterEvent::SourceUnavailable`],
//! but never blocks the rest of the refresh cycle.

use crate::catalog::{Availability, SourceHealth, ToolSource, UnifiedTool, UsageStats};
use crate::classify::{classify_category, extract_tags, ClassifierConfig};
use crate::error::ProviderError;
use crate::events::{EventBus, RouterEvent};
use crate::preferences::DEFAULT_SOURCE_WEIGHT;
use crate::provider::{ProviderRegistry, ToolDescriptor, ToolProvider};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Discovers and normalizes tools from all registered providers.
#[derive(Debug)]
pub struct DiscoveryService {
    providers: Arc<ProviderRegistry>,
    classifier: ClassifierConfig,
    events: EventBus,
    /// Last-known health per source, updated every discovery attempt.
    health: DashMap<String, SourceHealth>,
}

impl DiscoveryService {
    /// Creates a discovery service over the given provider registry.
    pub fn new(
        providers: Arc<ProviderRegistry>,
        classifier: ClassifierConfig,
        events: EventBus,
    ) -> Self {
        Self {
            providers,
            classifier,
            events,
            health: DashMap::new(),
        }
    }

    /// Health snapshot recorded at the source's last discovery attempt.
    pub fn source_health(&self, source_id: &str) -> Option<SourceHealth> {
        self.health.get(source_id).map(|h| h.clone())
    }

    /// Queries all providers concurrently and returns the merged set of
    /// normalized tools.
    ///
    /// Per-provider failures are contained: the failing source's tools
    /// are omitted for this cycle and a `SourceUnavailable` event is
    /// emitted.
    pub async fn discover_all(&self) -> Vec<UnifiedTool> {
        let providers = self.providers.all();
        debug!(provider_count = providers.len(), "starting discovery cycle");

        let tasks = providers
            .into_iter()
            .map(|provider| async move { self.discover_provider(provider).await });

        let mut tools = Vec::new();
        for outcome in join_all(tasks).await {
            match outcome {
                Ok(mut discovered) => tools.append(&mut discovered),
                Err((source_id, error)) => {
                    warn!(source_id = %source_id, error = %error, "provider discovery failed");
                    self.events.emit(RouterEvent::SourceUnavailable {
                        source_id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        debug!(tool_count = tools.len(), "discovery cycle finished");
        tools
    }

    /// Re-discovers a single provider on demand.
    pub async fn discover_source(
        &self,
        source_id: &str,
    ) -> Result<Vec<UnifiedTool>, ProviderError> {
        let provider = self
            .providers
            .get(source_id)
            .ok_or_else(|| ProviderError::ToolNotFound(format!("source '{source_id}'")))?;

        self.discover_provider(provider)
            .await
            .map_err(|(_, error)| error)
    }

    async fn discover_provider(
        &self,
        provider: Arc<dyn ToolProvider>,
    ) -> Result<Vec<UnifiedTool>, (String, ProviderError)> {
        let source_id = provider.id().to_string();

        let descriptors = match provider.list_tools().await {
            Ok(descriptors) => descriptors,
            Err(error) => {
                self.health.insert(source_id.clone(), SourceHealth::offline());
                return Err((source_id, error));
            }
        };

        let health = provider.health().await;
        self.health.insert(source_id.clone(), health.clone());

        let source = ToolSource {
            id: source_id.clone(),
            name: provider.display_name().to_string(),
            kind: provider.kind(),
            health,
        };

        debug!(
            source_id = %source_id,
            tool_count = descriptors.len(),
            "provider discovery succeeded"
        );

        Ok(descriptors
            .into_iter()
            .map(|descriptor| self.normalize(&source, descriptor))
            .collect())
    }

    /// Turns a raw descriptor into a catalog entry: id assignment,
    /// category classification, tag extraction, initial availability.
    fn normalize(&self, source: &ToolSource, descriptor: ToolDescriptor) -> UnifiedTool {
        let category =
            classify_category(&self.classifier, &descriptor.name, &descriptor.description);
        let tags = extract_tags(&self.classifier, &descriptor.name, &descriptor.description);

        UnifiedTool {
            id: UnifiedTool::derive_id(&source.id, &descriptor.name),
            name: descriptor.name,
            description: descriptor.description,
            source: source.clone(),
            category,
            input_schema: descriptor.input_schema,
            output_schema: descriptor.output_schema,
            tags,
            usage: UsageStats::default(),
            relevance: None,
            availability: Availability::available(),
            conflicts: Vec::new(),
            preference_weight: DEFAULT_SOURCE_WEIGHT,
        }
    }
}
