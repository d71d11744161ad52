// Unit tests for client-core internals.
// Public API tests against a live socket are in integration_tests/.

mod ipc;
mod session;
