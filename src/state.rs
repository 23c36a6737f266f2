// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::registration::RegistrationWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<RegistrationWorkflow>,
}

impl AppState {
    pub fn new(workflow: RegistrationWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}
