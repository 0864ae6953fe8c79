//! HTTP-level tests running the client against a local mock server.
