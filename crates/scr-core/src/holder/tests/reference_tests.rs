use crate::holder::ComponentState;
use crate::metadata::{Cardinality, ComponentMetadata, ReferencePolicy};
use crate::service::ServiceRegistry;
use crate::tests::integration::common::{plain, requiring, Fixture};

#[tokio::test]
async fn test_static_reference_loss_deactivates_then_unbinds() {
    let fx = Fixture::new();
    let first = fx.external("I");
    let holder = fx.register(plain("A").with_reference(requiring("I")));
    fx.settle().await;
    assert_eq!(holder.state(), ComponentState::Active);

    fx.services.unregister(first.id());
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Unsatisfied);
    assert_eq!(
        fx.log().of("A"),
        vec![
            format!("A:bind:{}", first.id()),
            "A:activate".to_string(),
            "A:deactivate:reference unavailable".to_string(),
            format!("A:unbind:{}", first.id()),
        ]
    );

    let second = fx.external("I");
    fx.settle().await;
    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(holder.snapshot().references.get("I"), Some(&vec![second.id()]));
}

#[tokio::test]
async fn test_static_reference_ignores_extra_provider_when_full() {
    let fx = Fixture::new();
    let first = fx.external("I");
    let holder = fx.register(plain("A").with_reference(requiring("I")));
    fx.settle().await;

    fx.external("I");
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(fx.log().count("A:activate"), 1);
    assert_eq!(holder.snapshot().references.get("I"), Some(&vec![first.id()]));
}

#[tokio::test]
async fn test_static_multiple_reference_reactivates_on_new_provider() {
    let fx = Fixture::new();
    let first = fx.external("I");
    let holder = fx.register(plain("A").with_reference(requiring("I").cardinality(Cardinality::Multiple)));
    fx.settle().await;

    let second = fx.external("I");
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(
        fx.log().of("A"),
        vec![
            format!("A:bind:{}", first.id()),
            "A:activate".to_string(),
            "A:deactivate:reference unavailable".to_string(),
            format!("A:unbind:{}", first.id()),
            format!("A:bind:{}", first.id()),
            format!("A:bind:{}", second.id()),
            "A:activate".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_dynamic_multiple_reference_binds_without_reactivation() {
    let fx = Fixture::new();
    let holder = fx.register(
        plain("A").with_reference(
            requiring("I")
                .cardinality(Cardinality::Multiple)
                .policy(ReferencePolicy::Dynamic),
        ),
    );
    fx.settle().await;
    assert_eq!(holder.state(), ComponentState::Active);

    let service = fx.external("I");
    fx.settle().await;
    fx.services.unregister(service.id());
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(
        fx.log().of("A"),
        vec![
            "A:activate".to_string(),
            format!("A:bind:{}", service.id()),
            format!("A:unbind:{}", service.id()),
        ]
    );
}

#[tokio::test]
async fn test_dynamic_mandatory_reference_rebinds_replacement() {
    let fx = Fixture::new();
    let first = fx.external("I");
    let second = fx.external("I");
    let holder = fx.register(plain("A").with_reference(requiring("I").policy(ReferencePolicy::Dynamic)));
    fx.settle().await;

    fx.services.unregister(first.id());
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(fx.log().count("A:activate"), 1, "Replacement must not reactivate");
    assert_eq!(
        fx.log().of("A"),
        vec![
            format!("A:bind:{}", first.id()),
            "A:activate".to_string(),
            format!("A:unbind:{}", first.id()),
            format!("A:bind:{}", second.id()),
        ]
    );
    assert_eq!(holder.snapshot().references.get("I"), Some(&vec![second.id()]));
}

#[tokio::test]
async fn test_dynamic_mandatory_reference_without_replacement_deactivates() {
    let fx = Fixture::new();
    let only = fx.external("I");
    let holder = fx.register(plain("A").with_reference(requiring("I").policy(ReferencePolicy::Dynamic)));
    fx.settle().await;

    fx.services.unregister(only.id());
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Unsatisfied);
    assert_eq!(fx.log().count("A:deactivate:reference unavailable"), 1);
}

#[tokio::test]
async fn test_optional_reference_does_not_block_activation() {
    let fx = Fixture::new();
    let holder = fx.register(plain("A").with_reference(requiring("I").cardinality(Cardinality::Optional)));
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(holder.snapshot().references.get("I"), Some(&vec![]));
}

#[tokio::test]
async fn test_own_service_is_never_bound() {
    let fx = Fixture::new();
    let holder = fx.register(
        ComponentMetadata::new("A", "A")
            .provides("I")
            .immediate(true)
            .with_reference(
                requiring("I")
                    .cardinality(Cardinality::Multiple)
                    .policy(ReferencePolicy::Dynamic),
            ),
    );
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert_eq!(fx.services.providers("I").len(), 1);
    assert_eq!(holder.snapshot().references.get("I"), Some(&vec![]));
    assert_eq!(fx.log().of("A"), vec!["A:activate"]);
}

#[tokio::test]
async fn test_failed_activation_is_retried_on_next_change() {
    let fx = Fixture::new();
    fx.module.failures.fail("A:activate");
    fx.external("I");
    let holder = fx.register(
        plain("A").with_reference(requiring("I").cardinality(Cardinality::AtLeastOne)),
    );
    fx.settle().await;
    assert_eq!(holder.state(), ComponentState::Unsatisfied);
    assert!(holder.last_error().is_some());

    fx.module.failures.heal("A:activate");
    fx.external("I");
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Active);
    assert!(holder.last_error().is_none());
    assert_eq!(holder.snapshot().references.get("I").map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_delayed_component_withdraws_deferred_service_when_unsatisfied() {
    let fx = Fixture::new();
    let dependency = fx.external("I");
    let holder = fx.register(
        ComponentMetadata::new("P", "P")
            .provides("J")
            .with_reference(requiring("I")),
    );
    fx.settle().await;
    assert_eq!(holder.state(), ComponentState::Satisfied);
    assert_eq!(fx.services.providers("J").len(), 1);

    fx.services.unregister(dependency.id());
    fx.settle().await;

    assert_eq!(holder.state(), ComponentState::Unsatisfied);
    assert!(fx.services.providers("J").is_empty());
    assert_eq!(fx.module.instances_of("P"), 0);
}

#[tokio::test]
async fn test_active_delayed_component_deactivates_on_loss() {
    let fx = Fixture::new();
    let dependency = fx.external("I");
    let producer = fx.register(
        ComponentMetadata::new("P", "P")
            .provides("J")
            .with_reference(requiring("I")),
    );
    let consumer = fx.register(plain("C").with_reference(requiring("J")));
    fx.settle().await;
    assert_eq!(producer.state(), ComponentState::Active);
    assert_eq!(consumer.state(), ComponentState::Active);

    fx.services.unregister(dependency.id());
    fx.settle().await;

    assert_eq!(producer.state(), ComponentState::Unsatisfied);
    assert_eq!(consumer.state(), ComponentState::Unsatisfied);
    assert!(fx.services.providers("J").is_empty());
    assert_eq!(fx.log().count("C:deactivate:reference unavailable"), 1);
    assert_eq!(fx.log().count("P:deactivate:reference unavailable"), 1);
}
