use thiserror::Error;

/// A type-erased collaborator error carried through the mediator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("Broker call failed: {0}")]
    Broker(#[source] BoxError),

    #[error("Database call failed: {0}")]
    Database(#[source] BoxError),

    #[error("No mediator has been registered with this component.")]
    Unbound,

    #[error("The mediator this component was registered with is no longer running.")]
    Detached,
}
