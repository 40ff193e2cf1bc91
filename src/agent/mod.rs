#[allow(clippy::module_inception)]
pub mod agent;
pub mod loop_;
pub mod repl;
pub mod session;

pub use agent::{Agent, DEFAULT_INSTRUCTION, NO_RESPONSE};
pub use loop_::run;
pub use repl::{chat_loop, is_exit_command, LineReader, TerminalReader};
pub use session::{InMemorySessionService, Runner, SessionKey};
