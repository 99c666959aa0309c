//! Example module with two components: `TranslationService` upper-cases
//! keys, and `HelloService` greets by name through the translation it is
//! bound to.
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use log::info;
use scr_core::module::ModuleError;
use scr_core::{
    Component, ComponentContext, ComponentError, ComponentMetadata, Module, ModuleInfo, ModuleState,
    ReferenceMetadata, ServiceReference,
};

pub const MODULE_NAME: &str = "hello.example";
pub const MODULE_VERSION: &str = "1.0.0";

pub const HELLO_INTERFACE: &str = "hello.example.HelloService";
pub const TRANSLATION_INTERFACE: &str = "hello.example.TranslationService";

pub const HELLO_COMPONENT: &str = "hello.example.HelloServiceImpl";
pub const TRANSLATION_COMPONENT: &str = "hello.example.TranslationServiceImpl";

/// Descriptors contributed by the module
pub fn descriptors() -> Vec<ComponentMetadata> {
    vec![
        ComponentMetadata::new(HELLO_COMPONENT, HELLO_COMPONENT)
            .provides(HELLO_INTERFACE)
            .immediate(true)
            .with_reference(
                ReferenceMetadata::new(TRANSLATION_INTERFACE)
                    .named("translation")
                    .bind("setTranslationService"),
            ),
        ComponentMetadata::new(TRANSLATION_COMPONENT, TRANSLATION_COMPONENT)
            .provides(TRANSLATION_INTERFACE)
            .immediate(true),
    ]
}

#[derive(Debug, Default)]
pub struct TranslationComponent;

impl TranslationComponent {
    pub fn translate(&self, key: &str) -> String {
        key.to_uppercase()
    }
}

#[async_trait]
impl Component for TranslationComponent {
    async fn activate(&self, _method: &str, context: &ComponentContext) -> Result<(), ComponentError> {
        info!("[{}] Translation service activated", context.name());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct HelloComponent {
    translation: Mutex<Option<ServiceReference>>,
}

impl HelloComponent {
    /// Greet `name`, translated when a translation service is bound
    pub fn say_hello(&self, name: &str) -> String {
        let translation = self
            .translation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let name = translation
            .and_then(|service| service.with_object::<TranslationComponent, _>(|t| t.translate(name)))
            .unwrap_or_else(|| name.to_string());
        format!("Hello, {}", name)
    }
}

#[async_trait]
impl Component for HelloComponent {
    async fn activate(&self, _method: &str, context: &ComponentContext) -> Result<(), ComponentError> {
        info!("[{}] Hello service activated", context.name());
        Ok(())
    }

    async fn bind(&self, method: &str, service: &ServiceReference) -> Result<(), ComponentError> {
        match method {
            "setTranslationService" => {
                info!("Set translation service {}", service.id());
                *self.translation.lock().unwrap_or_else(PoisonError::into_inner) = Some(service.clone());
                Ok(())
            }
            _ => Err(ComponentError::UnknownMethod {
                method: method.to_string(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The example module. Starts out active.
pub struct HelloModule {
    info: ModuleInfo,
    state: Mutex<ModuleState>,
}

impl HelloModule {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            info: ModuleInfo::new(id, MODULE_NAME, MODULE_VERSION),
            state: Mutex::new(ModuleState::Active),
        })
    }

    pub fn set_state(&self, state: ModuleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl Module for HelloModule {
    fn info(&self) -> ModuleInfo {
        self.info.clone()
    }

    fn state(&self) -> ModuleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn component_descriptors(&self) -> Result<Vec<ComponentMetadata>, ModuleError> {
        Ok(descriptors())
    }

    fn create_instance(&self, implementation: &str) -> Result<Arc<dyn Component>, ComponentError> {
        match implementation {
            HELLO_COMPONENT => Ok(Arc::new(HelloComponent::default())),
            TRANSLATION_COMPONENT => Ok(Arc::new(TranslationComponent)),
            other => Err(ComponentError::failed(format!("unknown implementation '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests;
