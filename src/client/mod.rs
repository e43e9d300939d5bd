mod cycle;
mod impls;

use crate::request_context::RequestDispatchContext;

/// HTTP client that attaches the stored bearer credential to every request
/// and repairs 401s through one shared refresh cycle.
///
/// Cloning is cheap; clones share the credential store, the refresh gate,
/// and the connection pool.
#[derive(Clone)]
pub struct AuthGateway {
    context: RequestDispatchContext,
}
