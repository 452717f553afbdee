// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every handler here declares a VerifiedIdentity, runs the ownership guard
// against the path username first, then parses the path id, then the body.

pub mod resources;
