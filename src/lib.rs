// Library root
// -----------
// This crate exposes a small library surface for the demo console. The
// binary (`main.rs`) wires these modules together.
//
// Module responsibilities:
// - `api`: the Cosmos DB REST client (request signing, addressing, paging
//   and typed resources).
// - `settings`: layered configuration (settings files, environment,
//   development secrets).
// - `ui`: the text menu and the command loop that dispatches demo codes.
// - `demos`: one fixed script per feature area, run against the client.
pub mod api;
pub mod demos;
pub mod settings;
pub mod ui;
