use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    #[error("The lifecycle actor has terminated and accepts no more tasks")]
    Terminated,

    #[error("The lifecycle actor dropped the reply of task '{0}'")]
    ReplyDropped(&'static str),
}
