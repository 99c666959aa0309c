//! End-to-end runs of the runtime against test modules

use std::sync::Arc;

use crate::holder::ComponentState;
use crate::kernel::{Error, ScrRuntime};
use crate::module::{Module, ModuleEvent};
use crate::registry::RegistryError;
use crate::service::{ServiceOwner, ServiceReference};
use crate::tests::integration::common::{plain, provider, requiring, EventLog, Failures, RecordingComponent, TestModule};

fn started(module: &Arc<TestModule>) -> ModuleEvent {
    ModuleEvent::Started(module.clone())
}

fn stopping(module: &Arc<TestModule>) -> ModuleEvent {
    ModuleEvent::Stopping(module.clone())
}

/// Provider of `interface` registered by the host, outside any module
fn host_service(runtime: &ScrRuntime, interface: &str) -> ServiceReference {
    runtime.services().register(
        &[interface.to_string()],
        ServiceOwner::External("host".to_string()),
        Some(Arc::new(RecordingComponent::new("host", EventLog::new(), Failures::new()))),
    )
}

#[tokio::test]
async fn test_component_without_dependencies_becomes_active() {
    let runtime = ScrRuntime::with_defaults();
    let module = TestModule::new(1, "m", vec![plain("A").immediate(true)]);

    runtime.module_changed(&started(&module));
    runtime.settle().await.unwrap();

    let snapshot = &runtime.get_components_by_name("A")[0];
    assert_eq!(snapshot.state, ComponentState::Active);
    assert!(snapshot.references.is_empty());
    assert_eq!(module.log.entries(), vec!["A:activate"]);
    runtime.stop().await.unwrap();
}

#[tokio::test]
async fn test_static_dependency_follows_its_provider() {
    let runtime = ScrRuntime::with_defaults();
    let module = TestModule::new(1, "m", vec![plain("A").with_reference(requiring("I"))]);
    runtime.module_changed(&started(&module));
    runtime.settle().await.unwrap();
    let id = runtime.component_id("A").unwrap();
    assert_eq!(runtime.get_component(id).unwrap().state, ComponentState::Unsatisfied);

    let service = host_service(&runtime, "I");
    runtime.settle().await.unwrap();
    assert_eq!(runtime.get_component(id).unwrap().state, ComponentState::Active);

    runtime.services().unregister(service.id());
    runtime.settle().await.unwrap();
    assert_eq!(runtime.get_component(id).unwrap().state, ComponentState::Unsatisfied);
    assert_eq!(
        module.log.entries(),
        vec![
            format!("A:bind:{}", service.id()),
            "A:activate".to_string(),
            "A:deactivate:reference unavailable".to_string(),
            format!("A:unbind:{}", service.id()),
        ]
    );
    runtime.stop().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_name_from_second_module_is_rejected() {
    let runtime = ScrRuntime::with_defaults();
    let first = TestModule::new(1, "first", vec![provider("svc", "I")]);
    let second = TestModule::new(2, "second", vec![provider("svc", "I")]);

    runtime.module_changed(&started(&first));
    runtime.settle().await.unwrap();
    let result = runtime.register_component(second.clone() as Arc<dyn Module>, provider("svc", "I"));
    runtime.module_changed(&started(&second));
    runtime.settle().await.unwrap();

    assert!(matches!(
        result,
        Err(Error::Registry(RegistryError::NameConflict { .. }))
    ));
    let components = runtime.get_components_by_name("svc");
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].module_name, "first");
    assert_eq!(components[0].state, ComponentState::Active);
    assert_eq!(second.instances_of("svc"), 0);
    assert_eq!(runtime.services().providers("I").len(), 1);
    runtime.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_activation_is_retried_by_dependency_event() {
    let runtime = ScrRuntime::with_defaults();
    let module = TestModule::new(
        1,
        "m",
        vec![
            plain("A").with_reference(requiring("I").cardinality(crate::metadata::Cardinality::AtLeastOne)),
            provider("P1", "I"),
        ],
    );
    module.failures.fail("A:activate");

    runtime.module_changed(&started(&module));
    runtime.settle().await.unwrap();
    let id = runtime.component_id("A").unwrap();
    let snapshot = runtime.get_component(id).unwrap();
    assert_eq!(snapshot.state, ComponentState::Unsatisfied);
    assert!(snapshot.last_error.is_some());

    module.failures.heal("A:activate");
    host_service(&runtime, "I");
    runtime.settle().await.unwrap();

    let snapshot = runtime.get_component(id).unwrap();
    assert_eq!(snapshot.state, ComponentState::Active);
    assert!(snapshot.last_error.is_none());
    runtime.stop().await.unwrap();
}

#[tokio::test]
async fn test_module_unload_disposes_and_frees_names() {
    let runtime = ScrRuntime::with_defaults();
    let host = TestModule::new(1, "host", vec![provider("P", "I")]);
    let module = TestModule::new(2, "m", vec![plain("A").with_reference(requiring("I"))]);
    runtime.start(&[host.clone() as Arc<dyn Module>, module.clone() as Arc<dyn Module>]);
    runtime.settle().await.unwrap();
    let service = runtime.services().providers("I").remove(0);

    runtime.module_changed(&stopping(&module));
    runtime.settle().await.unwrap();

    assert!(runtime.component_id("A").is_none());
    assert_eq!(
        module.log.of("A"),
        vec![
            format!("A:bind:{}", service.id()),
            "A:activate".to_string(),
            "A:deactivate:module stopped".to_string(),
            format!("A:unbind:{}", service.id()),
        ]
    );

    // The name is free for another module
    let other = TestModule::new(3, "other", vec![plain("A").with_reference(requiring("I"))]);
    runtime.module_changed(&started(&other));
    runtime.settle().await.unwrap();
    let snapshot = &runtime.get_components_by_name("A")[0];
    assert_eq!(snapshot.module_name, "other");
    assert_eq!(snapshot.state, ComponentState::Active);
    runtime.stop().await.unwrap();
}

#[tokio::test]
async fn test_chain_of_delayed_providers_activates_on_demand() {
    let runtime = ScrRuntime::with_defaults();
    let module = TestModule::new(
        1,
        "m",
        vec![
            crate::metadata::ComponentMetadata::new("Store", "Store").provides("IStore"),
            crate::metadata::ComponentMetadata::new("Cache", "Cache")
                .provides("ICache")
                .with_reference(requiring("IStore")),
            plain("App").with_reference(requiring("ICache")),
        ],
    );

    runtime.module_changed(&started(&module));
    runtime.settle().await.unwrap();

    let states: Vec<ComponentState> = runtime.list_components().iter().map(|s| s.state).collect();
    assert_eq!(states, vec![ComponentState::Active; 3]);
    let activations: Vec<String> = module
        .log
        .entries()
        .into_iter()
        .filter(|entry| entry.ends_with(":activate"))
        .collect();
    assert_eq!(activations, vec!["Store:activate", "Cache:activate", "App:activate"]);
    runtime.stop().await.unwrap();
}
