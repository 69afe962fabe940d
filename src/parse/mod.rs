pub mod canonical;
pub mod context;
pub mod tokenize;

pub use canonical::canonical_form;
pub use context::context_key;
pub use tokenize::{
    base_command, env_vars, flag_value, flag_values, positionals, split_subcommand, tokenize,
};
