// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use snaps_types::{Choice, Picker, Prompt, next_key};

use crate::read::read_line_timeout;

/// How long one menu waits for input before re-rendering.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Plain line-oriented picker: renders key→prompt maps to stdout and
/// reads single-line answers with a bounded wait.
#[derive(Debug, Default)]
pub struct LinePicker;

impl LinePicker {
    pub fn new() -> Self {
        Self
    }
}

impl Picker for LinePicker {
    fn pick(
        &mut self,
        title: &str,
        prompts: &BTreeMap<char, Prompt>,
        preselect: Option<char>,
    ) -> io::Result<Choice> {
        loop {
            println!("== {title} ==");
            for (key, prompt) in prompts {
                println!("  {key}) {}", prompt.text);
                if let Some(extra) = &prompt.extra {
                    for line in extra.lines() {
                        println!("     {line}");
                    }
                }
            }
            match preselect {
                Some(default) if prompts.contains_key(&default) => {
                    println!("choice [{default}]:")
                }
                _ => println!("choice:"),
            }

            let Some(line) = read_line_timeout(PROMPT_TIMEOUT)? else {
                continue;
            };
            let selected = match line.trim().chars().next() {
                Some(key) => key,
                None => match preselect {
                    Some(default) if prompts.contains_key(&default) => default,
                    _ => continue,
                },
            };
            if prompts.contains_key(&selected) {
                return Ok(Choice {
                    key: selected,
                    next: next_key(selected),
                });
            }
            println!("no such choice: {selected}");
        }
    }

    fn answer(&mut self, question: &str, seed: &str) -> io::Result<Option<String>> {
        println!("{question}");
        println!("[{seed}] (enter keeps it, \"-\" clears):");
        let Some(line) = read_line_timeout(PROMPT_TIMEOUT)? else {
            return Ok(None);
        };
        let line = line.trim();
        match line {
            "" => Ok(Some(seed.to_string())),
            "-" => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        println!("{question} [y/N]:");
        let Some(line) = read_line_timeout(PROMPT_TIMEOUT)? else {
            return Ok(false);
        };
        Ok(line.trim().to_lowercase().starts_with('y'))
    }

    fn alert(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }
}
