// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set. Otherwise the level follows `ENVIRONMENT`:
//! everything down to `debug` outside production, `warn` and above in
//! production.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{Config, LogFormat};

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(config: &Config) -> &'static str {
    if config.is_production() {
        "warn"
    } else {
        "debug,tower_http=debug,hyper=info,reqwest=info"
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &Config) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .try_init(),
    }
}
