/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Quiz authoring and lookup.
pub mod quiz_service;
/// Idle session reclamation.
pub mod reaper;
/// Session lifecycle, membership, and answer handling.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor.
pub mod storage_supervisor;
