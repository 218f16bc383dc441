//! Dashboard coordinator (verb module)
//!
//! Owns the filter store and the widget registry. Raw form input is parsed
//! and validated here, at the boundary: the store is only ever replaced with
//! a consistent, typed snapshot.

mod error;

pub use error::SubmitError;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::binding::WidgetBinding;
use crate::builder::QueryBuilder;
use crate::error::ConfigError;
use crate::filter::{FilterState, FilterStore, SubscriptionId};
use crate::model::{DashboardConfig, WidgetDef};
use crate::parser;
use crate::source::DataSource;

struct RegisteredWidget {
    binding: Arc<WidgetBinding>,
    subscription: SubscriptionId,
}

/// Coordinates filter submissions and widget notifications for one dashboard
pub struct Coordinator {
    store: Arc<FilterStore>,
    source: Arc<dyn DataSource>,
    builder: QueryBuilder,
    widgets: Vec<RegisteredWidget>,
}

impl Coordinator {
    /// A coordinator with an empty initial snapshot (every filter unset)
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self::with_initial_filters(source, FilterState::empty())
    }

    /// A coordinator primed with persisted or query-string defaults
    pub fn with_initial_filters(source: Arc<dyn DataSource>, initial: FilterState) -> Self {
        Self {
            store: Arc::new(FilterStore::with_initial(initial)),
            source,
            builder: QueryBuilder::new(),
            widgets: Vec::new(),
        }
    }

    /// Use a customized query builder (non-default timestamp/status columns)
    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Build a coordinator and register every widget in the configuration
    pub fn from_config(
        config: &DashboardConfig,
        source: Arc<dyn DataSource>,
    ) -> Result<Self, ConfigError> {
        let mut coordinator = Self::new(source);
        for def in &config.widgets {
            coordinator.register_widget(def)?;
        }
        Ok(coordinator)
    }

    /// The shared filter store; bindings hold a reference, not ownership
    pub fn store(&self) -> &Arc<FilterStore> {
        &self.store
    }

    /// Register a widget: build its binding, prime it with the current
    /// snapshot, and subscribe it for future changes
    ///
    /// Notification order follows registration order.
    pub fn register_widget(&mut self, def: &WidgetDef) -> Result<Arc<WidgetBinding>, ConfigError> {
        if self.widgets.iter().any(|w| w.binding.name() == def.name) {
            return Err(ConfigError::Invalid {
                message: format!("widget '{}' is already registered", def.name),
            });
        }

        let binding = Arc::new(WidgetBinding::new(
            def,
            self.store.clone(),
            self.source.clone(),
            self.builder.clone(),
        )?);

        let (state, version) = self.store.current_versioned();
        debug!(widget = %binding.name(), version, "priming widget");
        binding.on_filter_changed(&state, version);

        let subscription = {
            let binding = binding.clone();
            self.store
                .subscribe(move |state, version| binding.on_filter_changed(state, version))
        };
        self.widgets.push(RegisteredWidget {
            binding: binding.clone(),
            subscription,
        });
        Ok(binding)
    }

    /// Remove a widget; it receives no further notifications
    pub fn unregister_widget(&mut self, name: &str) -> bool {
        let Some(index) = self
            .widgets
            .iter()
            .position(|w| w.binding.name() == name)
        else {
            return false;
        };
        let widget = self.widgets.remove(index);
        self.store.unsubscribe(widget.subscription);
        true
    }

    pub fn widget(&self, name: &str) -> Option<&Arc<WidgetBinding>> {
        self.widgets
            .iter()
            .find(|w| w.binding.name() == name)
            .map(|w| &w.binding)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Arc<WidgetBinding>> {
        self.widgets.iter().map(|w| &w.binding)
    }

    /// Parse raw form values, validate them, and replace the store
    ///
    /// On any error the store keeps its previous snapshot; nothing is
    /// notified. Errors are field-level messages for the UI layer.
    pub fn submit_filters(
        &self,
        raw: &BTreeMap<String, String>,
    ) -> Result<Arc<FilterState>, SubmitError> {
        let state = parser::parse_form_values(raw).map_err(SubmitError::Validation)?;
        self.builder.check_range(&state).map_err(SubmitError::Range)?;
        self.store.replace(state);
        Ok(self.store.current())
    }
}
