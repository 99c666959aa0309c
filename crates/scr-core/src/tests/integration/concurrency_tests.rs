//! Module events and admin requests arriving from many threads at once

use std::sync::Arc;
use std::thread;

use crate::holder::ComponentState;
use crate::kernel::ScrRuntime;
use crate::module::ModuleEvent;
use crate::tests::integration::common::{plain, provider, requiring, TestModule};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_start_events_load_once() {
    let runtime = Arc::new(ScrRuntime::with_defaults());
    let module = TestModule::new(1, "m", vec![plain("A"), provider("P", "I")]);

    thread::scope(|scope| {
        for index in 0..8 {
            let runtime = runtime.clone();
            let module = module.clone();
            scope.spawn(move || {
                let event = if index % 2 == 0 {
                    ModuleEvent::Started(module)
                } else {
                    ModuleEvent::LazyActivation(module)
                };
                runtime.module_changed(&event);
            });
        }
    });
    runtime.settle().await.unwrap();

    assert_eq!(module.descriptor_reads(), 1);
    assert_eq!(runtime.list_components().len(), 2);
    assert_eq!(module.log.count("A:activate"), 1);
    assert_eq!(module.log.count("P:activate"), 1);
    runtime.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_modules_started_concurrently() {
    let runtime = Arc::new(ScrRuntime::with_defaults());
    let consumers: Vec<Arc<TestModule>> = (1..=6)
        .map(|id| {
            TestModule::new(
                id,
                &format!("consumer-{}", id),
                vec![plain(&format!("C{}", id)).with_reference(requiring("I"))],
            )
        })
        .collect();
    let host = TestModule::new(100, "host", vec![provider("P", "I")]);

    thread::scope(|scope| {
        for module in consumers.iter().chain(std::iter::once(&host)) {
            let runtime = runtime.clone();
            let module = module.clone();
            scope.spawn(move || runtime.module_changed(&ModuleEvent::Started(module)));
        }
    });
    runtime.settle().await.unwrap();

    let snapshots = runtime.list_components();
    assert_eq!(snapshots.len(), 7);
    assert!(snapshots.iter().all(|s| s.state == ComponentState::Active));
    runtime.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_and_stop_race_leaves_no_component_behind() {
    let runtime = Arc::new(ScrRuntime::with_defaults());
    let module = TestModule::new(1, "m", vec![plain("A"), plain("B")]);

    thread::scope(|scope| {
        let starter = runtime.clone();
        let started = module.clone();
        scope.spawn(move || starter.module_changed(&ModuleEvent::Started(started)));
        let stopper = runtime.clone();
        let stopped = module.clone();
        scope.spawn(move || stopper.module_changed(&ModuleEvent::Stopping(stopped)));
    });
    runtime.settle().await.unwrap();
    runtime.module_changed(&ModuleEvent::Stopping(module.clone()));
    runtime.settle().await.unwrap();

    assert!(runtime.list_components().is_empty());
    assert!(!runtime.loader().is_loaded(1));
    assert_eq!(module.log.count("A:activate"), module.log.count("A:deactivate:module stopped"));
    runtime.stop().await.unwrap();
}
