use std::sync::Arc;

use scr_core::{ComponentState, Module, ModuleEvent, ScrRuntime};

use crate::{HelloComponent, HelloModule, HELLO_COMPONENT, HELLO_INTERFACE, TRANSLATION_COMPONENT};

#[tokio::test]
async fn test_hello_greets_through_translation() {
    let runtime = ScrRuntime::with_defaults();
    let module = HelloModule::new(1);
    runtime.start(&[module.clone() as Arc<dyn Module>]);
    runtime.settle().await.unwrap();

    for name in [HELLO_COMPONENT, TRANSLATION_COMPONENT] {
        let snapshot = &runtime.get_components_by_name(name)[0];
        assert_eq!(snapshot.state, ComponentState::Active, "{} should be active", name);
    }

    let hello = runtime.services().providers(HELLO_INTERFACE).remove(0);
    let greeting = hello.with_object::<HelloComponent, _>(|h| h.say_hello("world"));
    assert_eq!(greeting.as_deref(), Some("Hello, WORLD"));

    runtime.module_changed(&ModuleEvent::Stopping(module.clone()));
    runtime.settle().await.unwrap();
    assert!(runtime.list_components().is_empty());
    runtime.stop().await.unwrap();
}

#[test]
fn test_unbound_hello_uses_plain_name() {
    assert_eq!(HelloComponent::default().say_hello("world"), "Hello, world");
}

#[test]
fn test_unknown_implementation_is_rejected() {
    let module = HelloModule::new(1);
    assert!(module.create_instance("nope").is_err());
}
