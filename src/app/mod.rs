// Application layer: wires configuration, adapters and core tasks per command.

#[cfg(feature = "cli")]
pub mod commands;
