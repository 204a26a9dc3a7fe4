//! G-code lexing and modal-state types shared by `Channel`.

pub mod arc;
pub mod block;
pub mod lexer;
pub mod modal;

pub use block::{Block, Word};
pub use lexer::{tokenize_program, LexResult};
pub use modal::{DistanceMode, FeedMode, ModalState, MotionMode, PathMode, Plane, SpindleMode};
