use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::actor::ActorHandle;
use crate::holder::component::{Component, ComponentContext, DeactivationReason};
use crate::holder::dependency::{DependencyChange, ReferenceListener};
use crate::holder::error::{ComponentError, LifecycleError};
use crate::holder::state::{ComponentSnapshot, ComponentState, HolderKind};
use crate::metadata::{ComponentMetadata, ReferenceMetadata};
use crate::module::{ModuleContext, ModuleInfo};
use crate::registry::{ComponentId, ComponentRegistry};
use crate::service::{ServiceEvent, ServiceObject, ServiceOwner, ServiceReference, TrackerId};

type ActivationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), LifecycleError>> + Send + 'a>>;

/// A component instance that completed its bind and activate sequence
struct LiveInstance {
    id: ComponentId,
    component: Arc<dyn Component>,
    context: ComponentContext,
    registration: Option<ServiceReference>,
}

struct HolderInner {
    state: ComponentState,
    enabled: bool,
    bound: BTreeMap<String, Vec<ServiceReference>>,
    trackers: Vec<TrackerId>,
    instances: Vec<LiveInstance>,
    /// Registration made on behalf of a delayed component before activation
    deferred: Option<ServiceReference>,
    last_error: Option<String>,
}

/// Runtime owner of one component: its metadata, state, bound providers
/// and instance(s).
///
/// Every mutating method is driven by the serializing actor, so transitions
/// of one holder never overlap. The inner lock only guards field access and
/// is never held across a component hook or a service registry call.
pub struct ComponentHolder {
    id: ComponentId,
    metadata: Arc<ComponentMetadata>,
    kind: HolderKind,
    module: Arc<ModuleContext>,
    registry: Weak<ComponentRegistry>,
    actor: ActorHandle,
    self_ref: Weak<ComponentHolder>,
    inner: Mutex<HolderInner>,
}

impl ComponentHolder {
    pub(crate) fn new(
        id: ComponentId,
        metadata: Arc<ComponentMetadata>,
        kind: HolderKind,
        module: Arc<ModuleContext>,
        registry: Weak<ComponentRegistry>,
        actor: ActorHandle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id,
            metadata,
            kind,
            module,
            registry,
            actor,
            self_ref: self_ref.clone(),
            inner: Mutex::new(HolderInner {
                state: ComponentState::Unsatisfied,
                enabled: false,
                bound: BTreeMap::new(),
                trackers: Vec::new(),
                instances: Vec::new(),
                deferred: None,
                last_error: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HolderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &Arc<ComponentMetadata> {
        &self.metadata
    }

    pub fn kind(&self) -> HolderKind {
        self.kind
    }

    pub fn module_info(&self) -> &ModuleInfo {
        self.module.info()
    }

    pub fn state(&self) -> ComponentState {
        self.lock().state
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Ids of all factory instances currently alive
    pub fn instance_ids(&self) -> Vec<ComponentId> {
        self.lock()
            .instances
            .iter()
            .filter(|instance| instance.id != self.id)
            .map(|instance| instance.id)
            .collect()
    }

    fn set_state(&self, state: ComponentState) {
        self.lock().state = state;
    }

    fn is_satisfied(&self) -> bool {
        let inner = self.lock();
        self.metadata.references.iter().all(|reference| {
            !reference.is_required()
                || inner
                    .bound
                    .get(&reference.name)
                    .is_some_and(|services| !services.is_empty())
        })
    }

    fn bound_to(&self, reference: &str) -> Vec<ServiceReference> {
        self.lock().bound.get(reference).cloned().unwrap_or_default()
    }

    fn is_own(&self, service: &ServiceReference) -> bool {
        service.component_name() == Some(self.name())
    }

    fn still_registered(&self, reference: &ReferenceMetadata, service: &ServiceReference) -> bool {
        self.module
            .services()
            .providers(&reference.interface)
            .iter()
            .any(|candidate| candidate.id() == service.id())
    }

    // ---- enable / disable / dispose ----

    /// Open the reference trackers, bind available providers and evaluate
    pub async fn enable(&self) {
        {
            let mut inner = self.lock();
            if inner.state.is_disposed() || inner.enabled {
                log::debug!("[{}] Ignoring enable in state {}", self.name(), inner.state);
                return;
            }
            inner.enabled = true;
        }
        log::debug!("[{}] Enabling component", self.name());

        // Track before querying so no provider slips between the two
        let mut trackers = Vec::with_capacity(self.metadata.references.len());
        for reference in &self.metadata.references {
            let listener = Arc::new(ReferenceListener {
                holder: self.self_ref.clone(),
                reference: reference.name.clone(),
                actor: self.actor.clone(),
            });
            trackers.push(self.module.services().track(&reference.interface, listener));
        }
        self.lock().trackers = trackers;

        for reference in &self.metadata.references {
            self.refill(reference, None);
        }
        self.evaluate().await;
    }

    /// Deactivate, close trackers and drop all bindings
    pub async fn disable(&self, reason: DeactivationReason) {
        {
            let inner = self.lock();
            if inner.state.is_disposed() || !inner.enabled {
                return;
            }
        }
        log::debug!("[{}] Disabling component ({})", self.name(), reason);

        self.deactivate(reason).await;
        self.unregister_deferred();

        let trackers = {
            let mut inner = self.lock();
            inner.enabled = false;
            inner.bound.clear();
            inner.state = ComponentState::Unsatisfied;
            std::mem::take(&mut inner.trackers)
        };
        for tracker in trackers {
            self.module.services().untrack(tracker);
        }
    }

    /// Disable and move to the terminal `Disposed` state, releasing the
    /// name and id in the registry.
    pub async fn dispose(&self, reason: DeactivationReason) {
        if self.state().is_disposed() {
            return;
        }
        self.disable(reason).await;
        self.set_state(ComponentState::Disposed);
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister_holder(self);
        }
        log::info!("[{}] Component disposed ({})", self.name(), reason);
    }

    // ---- dependency tracking ----

    /// Apply a provider change of one of the references
    pub async fn dependency_changed(&self, change: DependencyChange) {
        {
            let inner = self.lock();
            if inner.state.is_disposed() || !inner.enabled {
                return;
            }
        }
        let Some(reference) = self.metadata.reference(&change.reference) else {
            log::warn!(
                "[{}] Change for undeclared reference '{}'",
                self.name(),
                change.reference
            );
            return;
        };
        let service = change.event.reference();
        if self.is_own(service) {
            return;
        }

        match &change.event {
            ServiceEvent::Registered(service) => self.provider_added(reference, service).await,
            ServiceEvent::Unregistering(service) => self.provider_removed(reference, service).await,
        }
        self.evaluate().await;
    }

    async fn provider_added(&self, reference: &ReferenceMetadata, service: &ServiceReference) {
        if !self.still_registered(reference, service) {
            return;
        }
        let (state, bound) = {
            let inner = self.lock();
            (inner.state, inner.bound.get(&reference.name).cloned().unwrap_or_default())
        };
        if bound.iter().any(|existing| existing == service) {
            return;
        }
        if !reference.cardinality.accepts_more(bound.len()) {
            log::debug!(
                "[{}] Reference '{}' is full, ignoring service {}",
                self.name(),
                reference.name,
                service.id()
            );
            return;
        }

        if state != ComponentState::Active {
            self.push_bound(reference, service.clone());
            return;
        }

        if reference.is_dynamic() {
            let mut chain = vec![self.name().to_string()];
            if let Err(e) = self.ensure_provider(reference, service, &mut chain).await {
                log::warn!(
                    "[{}] Cannot bind service {} to '{}': {}",
                    self.name(),
                    service.id(),
                    reference.name,
                    e
                );
                return;
            }
            self.push_bound(reference, service.clone());
            self.bind_live(reference, service).await;
        } else {
            log::info!(
                "[{}] Static reference '{}' changed, reactivating",
                self.name(),
                reference.name
            );
            self.deactivate(DeactivationReason::ReferenceUnavailable).await;
            self.push_bound(reference, service.clone());
        }
    }

    async fn provider_removed(&self, reference: &ReferenceMetadata, service: &ServiceReference) {
        let state = {
            let inner = self.lock();
            let bound = inner.bound.get(&reference.name);
            if !bound.is_some_and(|services| services.contains(service)) {
                return;
            }
            inner.state
        };

        if state == ComponentState::Active && reference.is_dynamic() {
            self.unbind_live(reference, service).await;
            self.remove_bound(reference, service);
            if reference.is_required() && self.bound_to(&reference.name).is_empty() {
                if !self.rebind_dynamic(reference, service).await {
                    log::info!(
                        "[{}] Required reference '{}' lost its last provider",
                        self.name(),
                        reference.name
                    );
                    self.deactivate(DeactivationReason::ReferenceUnavailable).await;
                }
            }
            return;
        }

        if state == ComponentState::Active {
            log::info!(
                "[{}] Static reference '{}' lost service {}, deactivating",
                self.name(),
                reference.name,
                service.id()
            );
            self.deactivate(DeactivationReason::ReferenceUnavailable).await;
        }
        self.remove_bound(reference, service);
        self.refill(reference, Some(service));
    }

    /// Pull a replacement provider for a required dynamic reference of an
    /// active component. Returns `false` when none could be bound.
    async fn rebind_dynamic(&self, reference: &ReferenceMetadata, removed: &ServiceReference) -> bool {
        let candidates: Vec<ServiceReference> = self
            .module
            .services()
            .providers(&reference.interface)
            .into_iter()
            .filter(|candidate| candidate != removed && !self.is_own(candidate))
            .collect();
        for candidate in candidates {
            let mut chain = vec![self.name().to_string()];
            if self.ensure_provider(reference, &candidate, &mut chain).await.is_err() {
                continue;
            }
            self.push_bound(reference, candidate.clone());
            self.bind_live(reference, &candidate).await;
            log::debug!(
                "[{}] Reference '{}' rebound to service {}",
                self.name(),
                reference.name,
                candidate.id()
            );
            return true;
        }
        false
    }

    /// Bind current providers to `reference` up to its cardinality
    fn refill(&self, reference: &ReferenceMetadata, removed: Option<&ServiceReference>) {
        let providers = self.module.services().providers(&reference.interface);
        let mut inner = self.lock();
        let bound = inner.bound.entry(reference.name.clone()).or_default();
        for provider in providers {
            if !reference.cardinality.accepts_more(bound.len()) {
                break;
            }
            if removed == Some(&provider) || self.is_own(&provider) || bound.contains(&provider) {
                continue;
            }
            bound.push(provider);
        }
    }

    fn push_bound(&self, reference: &ReferenceMetadata, service: ServiceReference) {
        log::debug!(
            "[{}] Bound service {} to reference '{}'",
            self.name(),
            service.id(),
            reference.name
        );
        self.lock()
            .bound
            .entry(reference.name.clone())
            .or_default()
            .push(service);
    }

    fn remove_bound(&self, reference: &ReferenceMetadata, service: &ServiceReference) {
        if let Some(bound) = self.lock().bound.get_mut(&reference.name) {
            bound.retain(|existing| existing != service);
        }
    }

    fn live_components(&self) -> Vec<Arc<dyn Component>> {
        self.lock()
            .instances
            .iter()
            .map(|instance| instance.component.clone())
            .collect()
    }

    async fn bind_live(&self, reference: &ReferenceMetadata, service: &ServiceReference) {
        let Some(method) = &reference.bind else {
            return;
        };
        for component in self.live_components() {
            if let Err(e) = component.bind(method, service).await {
                log::warn!("[{}] Bind method '{}' failed: {}", self.name(), method, e);
            }
        }
    }

    async fn unbind_live(&self, reference: &ReferenceMetadata, service: &ServiceReference) {
        let Some(method) = &reference.unbind else {
            return;
        };
        for component in self.live_components() {
            if let Err(e) = component.unbind(method, service).await {
                log::warn!("[{}] Unbind method '{}' failed: {}", self.name(), method, e);
            }
        }
    }

    // ---- satisfaction ----

    /// Move between `Unsatisfied`, `Satisfied` and `Active` according to
    /// the current bindings.
    async fn evaluate(&self) {
        let (state, enabled) = {
            let inner = self.lock();
            (inner.state, inner.enabled)
        };
        if !enabled {
            return;
        }
        let satisfied = self.is_satisfied();
        match state {
            ComponentState::Unsatisfied if satisfied => {
                self.set_state(ComponentState::Satisfied);
                log::debug!("[{}] Component satisfied", self.name());
                self.on_satisfied().await;
            }
            ComponentState::Satisfied if !satisfied => {
                self.unregister_deferred();
                self.set_state(ComponentState::Unsatisfied);
                log::debug!("[{}] Component no longer satisfied", self.name());
            }
            ComponentState::Active if !satisfied => {
                self.deactivate(DeactivationReason::ReferenceUnavailable).await;
            }
            _ => {}
        }
    }

    async fn on_satisfied(&self) {
        match self.kind {
            HolderKind::Factory => {
                log::info!("[{}] Component factory available", self.name());
            }
            HolderKind::Unconfigured if self.metadata.is_immediate() => {
                let mut chain = Vec::new();
                // Failures are recorded and logged by `activate`
                let _ = self.activate(&mut chain).await;
            }
            HolderKind::Unconfigured => self.register_deferred(),
        }
    }

    fn register_deferred(&self) {
        if !self.metadata.provides_service() || self.lock().deferred.is_some() {
            return;
        }
        let registration = self.module.services().register(
            &self.metadata.provides,
            ServiceOwner::Component(self.name().to_string()),
            None,
        );
        log::debug!(
            "[{}] Registered deferred service {}",
            self.name(),
            registration.id()
        );
        self.lock().deferred = Some(registration);
    }

    fn unregister_deferred(&self) {
        let deferred = self.lock().deferred.take();
        if let Some(registration) = deferred {
            self.module.services().unregister(registration.id());
            registration.clear();
        }
    }

    // ---- activation ----

    /// Activate the single instance of an unconfigured holder.
    ///
    /// `chain` lists the components whose activation is in progress on the
    /// current task; a delayed provider is activated first when a consumer
    /// binds it, and meeting a name twice is a cycle.
    pub(crate) fn activate<'a>(&'a self, chain: &'a mut Vec<String>) -> ActivationFuture<'a> {
        Box::pin(async move {
            {
                let inner = self.lock();
                match inner.state {
                    ComponentState::Disposed => return Err(LifecycleError::Disposed(self.name().to_string())),
                    _ if !inner.enabled => return Err(LifecycleError::Disabled(self.name().to_string())),
                    _ if self.kind == HolderKind::Factory => {
                        return Err(LifecycleError::IsAFactory(self.name().to_string()));
                    }
                    ComponentState::Active => return Ok(()),
                    ComponentState::Satisfied => {}
                    ComponentState::Activating => {
                        let mut cycle = chain.clone();
                        cycle.push(self.name().to_string());
                        return Err(LifecycleError::CircularDependency(cycle));
                    }
                    _ => return Err(LifecycleError::NotSatisfied(self.name().to_string())),
                }
            }
            if chain.iter().any(|name| name == self.name()) {
                let mut cycle = chain.clone();
                cycle.push(self.name().to_string());
                return Err(LifecycleError::CircularDependency(cycle));
            }

            self.set_state(ComponentState::Activating);
            log::debug!("[{}] Activating component", self.name());
            chain.push(self.name().to_string());
            let bound = self.lock().bound.clone();
            let result = self
                .create_instance(self.id, self.metadata.properties.clone(), bound, chain)
                .await;
            chain.pop();

            match result {
                Ok(mut instance) => {
                    if self.metadata.is_immediate() {
                        instance.registration = self.register_services(&instance);
                    } else {
                        let deferred = self.lock().deferred.clone();
                        match deferred {
                            Some(registration) => registration.fill(instance.component.clone()),
                            None => instance.registration = self.register_services(&instance),
                        }
                    }
                    let mut inner = self.lock();
                    inner.instances.push(instance);
                    inner.state = ComponentState::Active;
                    inner.last_error = None;
                    drop(inner);
                    log::info!("[{}] Component activated", self.name());
                    Ok(())
                }
                Err(e) => {
                    // On a cycle the holder stays satisfied and keeps its
                    // deferred service; only its own failures unsatisfy it.
                    let cyclic = matches!(e, LifecycleError::CircularDependency(_));
                    {
                        let mut inner = self.lock();
                        inner.state = if cyclic {
                            ComponentState::Satisfied
                        } else {
                            ComponentState::Failed
                        };
                        inner.last_error = Some(e.to_string());
                    }
                    log::error!("[{}] {}", self.name(), e);
                    if cyclic {
                        return Err(e);
                    }
                    // A delayed holder whose references still hold stays
                    // requestable and keeps its deferred registration.
                    if !self.metadata.is_immediate() && self.is_satisfied() {
                        self.set_state(ComponentState::Satisfied);
                        self.register_deferred();
                    } else {
                        self.unregister_deferred();
                        self.set_state(ComponentState::Unsatisfied);
                    }
                    Err(e)
                }
            }
        })
    }

    /// Make sure a bound provider has a service object, activating a
    /// delayed provider on the current task if needed.
    async fn ensure_provider(
        &self,
        reference: &ReferenceMetadata,
        service: &ServiceReference,
        chain: &mut Vec<String>,
    ) -> Result<(), LifecycleError> {
        if !service.is_deferred() {
            return Ok(());
        }
        let provider = match (service.component_name(), self.registry.upgrade()) {
            (Some(name), Some(registry)) => registry.lookup(name),
            _ => None,
        };
        if let Some(provider) = provider {
            provider.activate(chain).await?;
        }
        if service.is_deferred() {
            return Err(LifecycleError::ActivationFailure {
                component: self.name().to_string(),
                phase: "bind",
                source: ComponentError::failed(format!(
                    "service {} for reference '{}' has no object",
                    service.id(),
                    reference.name
                )),
            });
        }
        Ok(())
    }

    /// Instantiate, bind and activate one instance. Nothing is kept when a
    /// step fails: what was bound is unbound and the instance is dropped.
    async fn create_instance(
        &self,
        id: ComponentId,
        properties: BTreeMap<String, serde_json::Value>,
        bound: BTreeMap<String, Vec<ServiceReference>>,
        chain: &mut Vec<String>,
    ) -> Result<LiveInstance, LifecycleError> {
        for reference in &self.metadata.references {
            for service in bound.get(&reference.name).map(Vec::as_slice).unwrap_or(&[]) {
                self.ensure_provider(reference, service, chain).await?;
            }
        }

        let failure = |phase: &'static str, source: ComponentError| LifecycleError::ActivationFailure {
            component: self.name().to_string(),
            phase,
            source,
        };

        let component = self
            .module
            .module()
            .create_instance(&self.metadata.implementation)
            .map_err(|e| failure("instantiate", e))?;

        let mut done: Vec<(&ReferenceMetadata, ServiceReference)> = Vec::new();
        for reference in &self.metadata.references {
            let Some(method) = &reference.bind else {
                continue;
            };
            for service in bound.get(&reference.name).map(Vec::as_slice).unwrap_or(&[]) {
                if let Err(e) = component.bind(method, service).await {
                    self.unbind_all(component.as_ref(), &done).await;
                    return Err(failure("bind", e));
                }
                done.push((reference, service.clone()));
            }
        }

        let context = ComponentContext::new(self.name(), id, self.module_info().clone(), properties, bound);
        if let Err(e) = component.activate(&self.metadata.activate, &context).await {
            self.unbind_all(component.as_ref(), &done).await;
            return Err(failure("activate", e));
        }

        Ok(LiveInstance {
            id,
            component,
            context,
            registration: None,
        })
    }

    async fn unbind_all(&self, component: &dyn Component, bound: &[(&ReferenceMetadata, ServiceReference)]) {
        for (reference, service) in bound.iter().rev() {
            let Some(method) = &reference.unbind else {
                continue;
            };
            if let Err(e) = component.unbind(method, service).await {
                log::warn!("[{}] Unbind method '{}' failed: {}", self.name(), method, e);
            }
        }
    }

    fn register_services(&self, instance: &LiveInstance) -> Option<ServiceReference> {
        if !self.metadata.provides_service() {
            return None;
        }
        let registration = self.module.services().register(
            &self.metadata.provides,
            ServiceOwner::Component(self.name().to_string()),
            Some(instance.component.clone()),
        );
        log::debug!(
            "[{}] Registered service {} for instance {}",
            self.name(),
            registration.id(),
            instance.id
        );
        Some(registration)
    }

    // ---- deactivation ----

    /// Tear down every live instance and fall back to `Unsatisfied`
    async fn deactivate(&self, reason: DeactivationReason) {
        let instances = {
            let mut inner = self.lock();
            if inner.state != ComponentState::Active {
                return;
            }
            inner.state = ComponentState::Deactivating;
            std::mem::take(&mut inner.instances)
        };
        log::debug!("[{}] Deactivating component ({})", self.name(), reason);

        self.unregister_deferred();
        for instance in instances.into_iter().rev() {
            let id = instance.id;
            self.teardown_instance(instance, reason).await;
            if id != self.id {
                self.release_instance_id(id);
            }
        }

        self.set_state(ComponentState::Unsatisfied);
        log::info!("[{}] Component deactivated ({})", self.name(), reason);
    }

    /// Unregister services, call the deactivate hook, then unbind in
    /// reverse reference order.
    async fn teardown_instance(&self, instance: LiveInstance, reason: DeactivationReason) {
        if let Some(registration) = &instance.registration {
            self.module.services().unregister(registration.id());
            registration.clear();
        }

        if let Err(e) = instance
            .component
            .deactivate(&self.metadata.deactivate, &instance.context, reason)
            .await
        {
            log::warn!("[{}] Deactivation hook failed: {}", self.name(), e);
        }

        let bound = self.lock().bound.clone();
        for reference in self.metadata.references.iter().rev() {
            let Some(method) = &reference.unbind else {
                continue;
            };
            for service in bound.get(&reference.name).map(Vec::as_slice).unwrap_or(&[]).iter().rev() {
                if let Err(e) = instance.component.unbind(method, service).await {
                    log::warn!("[{}] Unbind method '{}' failed: {}", self.name(), method, e);
                }
            }
        }
    }

    fn release_instance_id(&self, id: ComponentId) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release_id(id);
        }
    }

    // ---- requests ----

    /// Return the instance of an unconfigured holder, activating a delayed
    /// component on first request.
    pub async fn request_instance(&self) -> Result<ServiceObject, LifecycleError> {
        let mut chain = Vec::new();
        self.activate(&mut chain).await?;
        self.lock()
            .instances
            .first()
            .map(|instance| instance.component.clone())
            .ok_or_else(|| LifecycleError::NotSatisfied(self.name().to_string()))
    }

    /// Create a factory instance with its own component id
    pub async fn new_instance(
        &self,
        properties: BTreeMap<String, serde_json::Value>,
    ) -> Result<ComponentId, LifecycleError> {
        {
            let inner = self.lock();
            if inner.state.is_disposed() {
                return Err(LifecycleError::Disposed(self.name().to_string()));
            }
            if self.kind != HolderKind::Factory {
                return Err(LifecycleError::NotAFactory(self.name().to_string()));
            }
            if !inner.enabled {
                return Err(LifecycleError::Disabled(self.name().to_string()));
            }
            if !matches!(inner.state, ComponentState::Satisfied | ComponentState::Active) {
                return Err(LifecycleError::NotSatisfied(self.name().to_string()));
            }
        }
        let (Some(registry), Some(this)) = (self.registry.upgrade(), self.self_ref.upgrade()) else {
            return Err(LifecycleError::Disposed(self.name().to_string()));
        };

        let id = registry.allocate_id();
        registry.register_id(id, this);

        let mut merged = self.metadata.properties.clone();
        merged.extend(properties);
        let bound = self.lock().bound.clone();
        let mut chain = vec![self.name().to_string()];

        match self.create_instance(id, merged, bound, &mut chain).await {
            Ok(mut instance) => {
                instance.registration = self.register_services(&instance);
                let mut inner = self.lock();
                inner.instances.push(instance);
                inner.state = ComponentState::Active;
                inner.last_error = None;
                drop(inner);
                log::info!("[{}] Factory instance {} created", self.name(), id);
                Ok(id)
            }
            Err(e) => {
                registry.release_id(id);
                self.lock().last_error = Some(e.to_string());
                log::error!("[{}] {}", self.name(), e);
                Err(e)
            }
        }
    }

    /// Tear down one factory instance
    pub async fn dispose_instance(&self, id: ComponentId) -> Result<(), LifecycleError> {
        let instance = {
            let mut inner = self.lock();
            if inner.state.is_disposed() {
                return Err(LifecycleError::Disposed(self.name().to_string()));
            }
            if self.kind != HolderKind::Factory {
                return Err(LifecycleError::NotAFactory(self.name().to_string()));
            }
            let Some(index) = inner.instances.iter().position(|instance| instance.id == id) else {
                return Err(LifecycleError::UnknownInstance {
                    component: self.name().to_string(),
                    id,
                });
            };
            inner.instances.remove(index)
        };

        self.teardown_instance(instance, DeactivationReason::Disposed).await;
        self.release_instance_id(id);
        {
            let mut inner = self.lock();
            if inner.instances.is_empty() && inner.state == ComponentState::Active {
                inner.state = ComponentState::Satisfied;
            }
        }
        log::info!("[{}] Factory instance {} disposed", self.name(), id);
        Ok(())
    }

    // ---- introspection ----

    pub fn snapshot(&self) -> ComponentSnapshot {
        let inner = self.lock();
        ComponentSnapshot {
            id: self.id,
            name: self.name().to_string(),
            implementation: self.metadata.implementation.clone(),
            module_id: self.module_info().id,
            module_name: self.module_info().symbolic_name.clone(),
            state: inner.state,
            enabled: inner.enabled,
            kind: self.kind,
            factory_of: None,
            references: inner
                .bound
                .iter()
                .map(|(name, services)| (name.clone(), services.iter().map(ServiceReference::id).collect()))
                .collect(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Snapshot of the holder followed by one per factory instance
    pub fn snapshots(&self) -> Vec<ComponentSnapshot> {
        let mut snapshots = vec![self.snapshot()];
        for id in self.instance_ids() {
            if let Some(snapshot) = self.snapshot_for(id) {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Snapshot of the holder itself or of one of its factory instances
    pub fn snapshot_for(&self, id: ComponentId) -> Option<ComponentSnapshot> {
        if id == self.id {
            return Some(self.snapshot());
        }
        let mut snapshot = self.snapshot();
        if !self.lock().instances.iter().any(|instance| instance.id == id) {
            return None;
        }
        snapshot.id = id;
        snapshot.state = ComponentState::Active;
        snapshot.factory_of = Some(self.id);
        snapshot.last_error = None;
        Some(snapshot)
    }
}

impl fmt::Debug for ComponentHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHolder")
            .field("id", &self.id)
            .field("name", &self.metadata.name)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}
