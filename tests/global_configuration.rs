//! The process-wide configuration cell.
//!
//! Kept to a single test so nothing else in this binary observes the global
//! while it is being changed.

use hot_reloader::prelude::*;
use hot_reloader::settings::{DEFAULT_CLONED_RESOURCE_TAG_NAME, reset_global_configuration};
use parking_lot::Mutex;
use std::sync::Arc;

fn reload_once(reloader: &Reloader, host: &Host, module: ResourceId) -> ResourceId {
    let _stop = reloader.listen(module, |_, _| {}, |_, _| {});
    host.set_source(module, format!("{}!", host.source(module).unwrap()))
        .unwrap();
    host.dispatch_pending();
    reloader.live_clone(module).unwrap()
}

#[test]
fn test_reloaders_capture_global_at_construction() {
    assert_eq!(
        get_global_configuration().cloned_resource_tag_name(),
        DEFAULT_CLONED_RESOURCE_TAG_NAME
    );

    let host = Host::new();
    let module = host.create_module("Weapons", Some(host.root()), "v1").unwrap();
    host.dispatch_pending();

    let before = Reloader::new(host.clone());

    let messages = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = Arc::clone(&messages);
    set_global_configuration(
        Configuration::from_props(ConfigurationProps {
            cloned_resource_tag_name: "LiveCopy".to_string(),
        })
        .unwrap()
        .with_printer(move |message| messages_clone.lock().push(message.to_string())),
    );
    assert_eq!(get_global_configuration().cloned_resource_tag_name(), "LiveCopy");

    let after = Reloader::new(host.clone());

    let old_clone = reload_once(&before, &host, module);
    assert!(host.has_tag(old_clone, DEFAULT_CLONED_RESOURCE_TAG_NAME));
    assert!(messages.lock().is_empty());
    before.destroy();

    let new_clone = reload_once(&after, &host, module);
    assert!(host.has_tag(new_clone, "LiveCopy"));
    assert_eq!(*messages.lock(), vec!["HotReloaded Weapons"]);
    after.destroy();

    reset_global_configuration();
    assert_eq!(
        get_global_configuration().cloned_resource_tag_name(),
        DEFAULT_CLONED_RESOURCE_TAG_NAME
    );
    assert_eq!(
        after.configuration().cloned_resource_tag_name(),
        "LiveCopy"
    );
}
