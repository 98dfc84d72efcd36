// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Pretty printers for reporting information.
use std::{borrow::Cow, sync::Mutex};

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNING_PRINTER: Mutex<Vec<Cow<'static, str>>> = Mutex::new(vec![]);
}

/// A titled block of related info log lines.
pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    lines: Vec<Cow<'static, str>>,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            lines: vec![],
        }
    }

    pub(crate) fn push_line(&mut self, line: Cow<'static, str>) {
        self.lines.push(line);
    }

    pub(crate) fn display(self) {
        log::info!("{}", console::style(self.title).bold());
        let num_lines = self.lines.len();
        for (i, line) in self.lines.into_iter().enumerate() {
            let symbol = if i + 1 == num_lines {
                UP_AND_RIGHT
            } else {
                VERTICAL_AND_RIGHT
            };
            log::info!("{symbol} {line}");
        }
        log::info!("");
    }
}

/// Collect a warning to be displayed with the others once argument parsing is
/// done.
pub(crate) trait Warn {
    fn warn(self);
}

impl Warn for &'static str {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push(self.into());
    }
}

impl Warn for String {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push(self.into());
    }
}

impl Warn for Cow<'static, str> {
    fn warn(self) {
        WARNING_PRINTER.lock().unwrap().push(self);
    }
}

/// Print out any warnings that have been collected as CLI arguments have been
/// parsed. This should only be called once, after all arguments have been
/// parsed into parameters.
pub(crate) fn display_warnings() {
    let mut warnings = WARNING_PRINTER.lock().unwrap();
    if warnings.is_empty() {
        return;
    }

    log::warn!("{}", console::style("Warnings").bold());
    let num_lines = warnings.len();
    for (i, line) in warnings.iter().enumerate() {
        let symbol = if i + 1 == num_lines {
            UP_AND_RIGHT
        } else {
            VERTICAL
        };
        log::warn!("{symbol} {line}");
    }
    log::warn!("");
    warnings.clear();
}
