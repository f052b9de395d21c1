//! Fixed-capacity command registry.
//!
//! Commands are appended at startup and never removed or mutated afterward.
//! Registration order is preserved and externally observable: the `CMD`
//! listing reports rows in table order.

use std::fmt;

use crate::error::{AtError, AtResult, HandlerResult};
use crate::hash::command_hash;
use crate::parse::Operation;

/// Maximum number of registered commands.
pub const AT_MAX_COMMANDS: usize = 50;

/// A command handler: invoked with the shared context, the argument string
/// (empty for non-Write operations), and a mutable output buffer.
///
/// The output buffer is the handler's sole side-channel for response text
/// (e.g. `+CWMODE:1`); multi-line responses use embedded `\n` separators.
/// The dispatch engine never synthesizes payload text itself.
pub type HandlerFn<C> = fn(&mut C, &str, &mut String) -> HandlerResult;

/// Builder for one command registration: a name plus up to four optional
/// operation handlers.
pub struct Command<C> {
    name: &'static str,
    read: Option<HandlerFn<C>>,
    write: Option<HandlerFn<C>>,
    test: Option<HandlerFn<C>>,
    execute: Option<HandlerFn<C>>,
}

impl<C> Command<C> {
    /// Start a registration for the given bare command name (no `AT+`).
    pub fn new(name: &'static str) -> Self {
        Command {
            name,
            read: None,
            write: None,
            test: None,
            execute: None,
        }
    }

    /// Attach the `AT+NAME?` handler.
    pub fn read(mut self, handler: HandlerFn<C>) -> Self {
        self.read = Some(handler);
        self
    }

    /// Attach the `AT+NAME=<args>` handler.
    pub fn write(mut self, handler: HandlerFn<C>) -> Self {
        self.write = Some(handler);
        self
    }

    /// Attach the `AT+NAME=?` handler.
    pub fn test(mut self, handler: HandlerFn<C>) -> Self {
        self.test = Some(handler);
        self
    }

    /// Attach the `AT+NAME` handler.
    pub fn execute(mut self, handler: HandlerFn<C>) -> Self {
        self.execute = Some(handler);
        self
    }
}

/// One occupied row of the command table.
pub struct CommandEntry<C> {
    hash: u32,
    name: &'static str,
    read: Option<HandlerFn<C>>,
    write: Option<HandlerFn<C>>,
    test: Option<HandlerFn<C>>,
    execute: Option<HandlerFn<C>>,
}

impl<C> CommandEntry<C> {
    /// The registered command name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The dispatch hash of the name. Never zero.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// The handler for the given operation, if one was registered.
    pub fn handler(&self, op: Operation) -> Option<HandlerFn<C>> {
        match op {
            Operation::Read => self.read,
            Operation::Write => self.write,
            Operation::Test => self.test,
            Operation::Execute => self.execute,
        }
    }

    /// Whether a handler is registered for the given operation.
    pub fn supports(&self, op: Operation) -> bool {
        self.handler(op).is_some()
    }
}

impl<C> fmt::Debug for CommandEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .field("test", &self.test.is_some())
            .field("execute", &self.execute.is_some())
            .finish()
    }
}

/// Fixed-capacity mapping from command name to its handler slots.
pub struct CommandTable<C> {
    entries: Vec<CommandEntry<C>>,
    capacity: usize,
}

impl<C> CommandTable<C> {
    /// Create a table with the default capacity of [`AT_MAX_COMMANDS`].
    pub fn new() -> Self {
        Self::with_capacity(AT_MAX_COMMANDS)
    }

    /// Create a table with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        CommandTable {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a command, appending it after all earlier registrations.
    ///
    /// A full table is a reported error, never a silent drop or overwrite.
    pub fn register(&mut self, command: Command<C>) -> AtResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(AtError::CapacityError(self.capacity));
        }

        let hash = command_hash(command.name);
        debug_assert!(
            self.entries
                .iter()
                .all(|e| e.hash != hash || e.name == command.name),
            "command name hash collision: {:?}",
            command.name
        );

        log::debug!("registered command {} (hash {:#010x})", command.name, hash);
        self.entries.push(CommandEntry {
            hash,
            name: command.name,
            read: command.read,
            write: command.write,
            test: command.test,
            execute: command.execute,
        });
        Ok(())
    }

    /// Look up a command by name.
    ///
    /// Hashes the queried name and linear-scans comparing hashes only.
    pub fn lookup(&self, name: &str) -> Option<&CommandEntry<C>> {
        let hash = command_hash(name);
        self.entries.iter().find(|entry| entry.hash == hash)
    }

    /// All entries, in registration order.
    pub fn entries(&self) -> &[CommandEntry<C>] {
        &self.entries
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The fixed capacity of the table.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<C> Default for CommandTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
