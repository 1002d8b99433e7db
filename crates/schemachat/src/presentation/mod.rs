//! Presentation module - display shapes for SQL, transcripts and turns
pub mod sql_table;
pub mod transcript;
pub mod turn;

pub use sql_table::{render_sql, ColumnConstraint, ColumnView, TableView};
pub use transcript::{render_message, render_transcript, RenderedMessage};
pub use turn::{default_project_name, run_turn, TurnError, TurnOutcome, TurnRequest};
