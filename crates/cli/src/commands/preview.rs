use std::path::Path;

use spendgate_core::rules::summary::summarize;

use crate::commands::{load_config, load_inputs, CommandResult};

pub fn run(draft: &Path, directory: Option<&Path>) -> CommandResult {
    let (rule, directory) = match load_inputs("preview", draft, directory) {
        Ok(inputs) => inputs,
        Err(result) => return result,
    };

    // config only tunes id truncation; previews still render when it fails to load
    let options =
        load_config("preview").map(|config| config.display.summary_options()).unwrap_or_default();

    let rendered = summarize(&rule, &directory, &options).to_string();
    CommandResult::success("preview", rendered.trim_end())
}
