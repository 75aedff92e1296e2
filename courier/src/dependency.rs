use courier_core::Interface;

use crate::client::Client;

/// A precondition checked before a coordinator runs.
///
/// Resources implement this: a resource is resolved once it holds a value.
/// Closures over the client work too.
///
/// ```ignore
/// let orders = EndpointCoordinator::new(ListOrders, ())
///     .depends_on(session_resource.clone())
///     .depends_on(|client: &Client<Api>| client.interface().is_signed_in());
/// ```
pub trait Dependency<I: Interface>: Send + Sync + 'static {
    /// Whether the precondition holds for `client`.
    fn is_resolved(&self, client: &Client<I>) -> bool;

    /// Name used in errors and logs.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<I, F> Dependency<I> for F
where
    I: Interface,
    F: Fn(&Client<I>) -> bool + Send + Sync + 'static,
{
    fn is_resolved(&self, client: &Client<I>) -> bool {
        self(client)
    }

    fn name(&self) -> String {
        "predicate".to_string()
    }
}
