/*!
CLI subcommand modules.

Kept minimal: module declarations plus the re-exports `main.rs` needs.
Each subcommand lives in its own file and exposes exactly one public
`execute_*` function returning `anyhow::Result<()>`; shared catalog
loading sits in `shared.rs`, styling in `format.rs`.

Directory Layout:
  src/cmd/
    mod.rs          (this file)
    run.rs          (RunArgs  + execute_run)
    repl.rs         (ReplArgs + execute_repl)
    list.rs         (ListArgs + execute_list)
    shared.rs       (catalog/extension loading, result printing)
    format.rs       (ANSI styling helpers)
*/

pub mod format;
pub mod list;
pub mod repl;
pub mod run;
pub mod shared;

pub use list::{ListArgs, execute_list};
pub use repl::{ReplArgs, execute_repl};
pub use run::{RunArgs, execute_run};
