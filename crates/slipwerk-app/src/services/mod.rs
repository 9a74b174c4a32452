// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: config resolution and the command implementations behind
// the CLI.

pub mod commands;
pub mod data_dir;
