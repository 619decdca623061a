// Copyright (c) The devshard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod pipeline;
mod properties;
