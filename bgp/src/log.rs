// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slog::{Drain, Logger};
use std::io::Write;

pub fn init_logger(component: &'static str) -> Logger {
    build_logger(std::io::stdout(), component)
}

pub fn build_logger<W: Write + Send + 'static>(
    w: W,
    component: &'static str,
) -> Logger {
    let drain = slog_bunyan::new(w).build().fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(0x8000)
        .build()
        .fuse();
    Logger::root(drain, slog::o!("component" => component))
}
