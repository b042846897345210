// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence layer.

pub mod token_store;

pub use token_store::TokenStore;
