//! Coordinator tests against a scripted transport.
