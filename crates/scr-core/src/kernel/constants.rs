/// Runtime name
pub const APP_NAME: &str = "SCR";

/// Runtime version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Property selecting the runtime log level (`debug`, `info`, `warn`, `error` or `1`..`4`)
pub const PROP_LOG_LEVEL: &str = "ds.loglevel";

/// Property enabling factory instance creation
pub const PROP_FACTORY_ENABLED: &str = "ds.factory.enabled";

/// Property selecting whether queued lifecycle tasks run on shutdown
pub const PROP_ACTOR_DRAIN: &str = "ds.actor.drain";

/// Default log level name
pub const DEFAULT_LOG_LEVEL: &str = "error";
