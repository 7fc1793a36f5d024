// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Grimoires and spells shipped inside the binary. Copied into
//! `<workspace>/.coven/{grimoires,spells}/` on first daemon startup (never
//! overwriting a file the user already has there), and always available as
//! the bottom layer of the user-first-then-builtin override chain.

/// `(file stem, YAML source)` pairs for every builtin grimoire.
pub const GRIMOIRES: &[(&str, &str)] = &[
    (
        "implement-with-tests",
        include_str!("../assets/grimoires/implement-with-tests.yaml"),
    ),
    (
        "quick-fix",
        include_str!("../assets/grimoires/quick-fix.yaml"),
    ),
];

/// `(file stem, Markdown source)` pairs for every builtin spell.
pub const SPELLS: &[(&str, &str)] = &[
    ("implement", include_str!("../assets/spells/implement.md")),
    ("fix-tests", include_str!("../assets/spells/fix-tests.md")),
    (
        "context-header",
        include_str!("../assets/spells/context-header.md"),
    ),
];
