//! Cross-crate and workspace hygiene tests live under `tests/`.
